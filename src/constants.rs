//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

use std::time::Duration;

/// Field manager identifier used for every server-side apply
pub const FIELD_MANAGER: &str = "platform-bootstrap-controller";

/// API group of the Platform CRD
pub const API_GROUP: &str = "platform-bootstrap.microscaler.io";

/// Annotation stamped on the Platform by the CLI when it starts a bootstrap.
/// Its presence is part of the exit-on-sync convergence predicate.
pub const CLI_START_TIME_ANNOTATION: &str = "platform-bootstrap.microscaler.io/cli-start-time";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Requeue interval after a successful pass when exit-on-sync is disabled.
/// Keeps the loop live so cluster drift is corrected.
pub const DEFAULT_REQUEUE: Duration = Duration::from_secs(15);

/// Requeue interval after a soft phase error
pub const ERR_REQUEUE: Duration = Duration::from_secs(5);

/// Requeue interval after a configuration error; retrying quickly will
/// not fix a bad package name or template
pub const CONFIG_ERR_REQUEUE: Duration = Duration::from_secs(60);

/// Requeue interval when the convergence predicate is not yet satisfied
pub const SYNC_REQUEUE: Duration = Duration::from_secs(10);

/// Upper bound for the Gateway API CRD establishment wait
pub const CRD_WAIT_TIMEOUT: Duration = Duration::from_secs(45);

/// Poll interval while waiting for CRD establishment
pub const CRD_WAIT_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound for the git server deployment readiness wait
pub const GIT_SERVER_DEPLOYMENT_TIMEOUT: Duration = Duration::from_secs(600);

/// Poll interval while waiting for the git server deployment
pub const GIT_SERVER_DEPLOYMENT_INTERVAL: Duration = Duration::from_secs(10);

/// Upper bound for the git server pod readiness wait
pub const GIT_SERVER_POD_TIMEOUT: Duration = Duration::from_secs(300);

/// Poll interval while waiting for git server pods
pub const GIT_SERVER_POD_INTERVAL: Duration = Duration::from_secs(5);

/// Soft yield for the git server's relational DB and cache dependencies
pub const GIT_SERVER_DEPENDENCY_YIELD: Duration = Duration::from_secs(15);

/// Warmup pause before the first git server API call
pub const GIT_SERVER_API_WARMUP: Duration = Duration::from_secs(30);

/// Expected Gateway API CRD names; all must reach Established=True
pub const GATEWAY_API_CRDS: [&str; 5] = [
    "gatewayclasses.gateway.networking.k8s.io",
    "gateways.gateway.networking.k8s.io",
    "httproutes.gateway.networking.k8s.io",
    "referencegrants.gateway.networking.k8s.io",
    "grpcroutes.gateway.networking.k8s.io",
];

/// Name of the platform Gateway resource
pub const GATEWAY_NAME: &str = "platform-gateway";

/// Prefix Cilium uses for the Service generated per Gateway
pub const DATAPLANE_SERVICE_PREFIX: &str = "cilium-gateway";

/// Name of the TLS secret referenced by the Gateway listener
pub const TLS_SECRET_NAME: &str = "platform-cert";

/// Namespace the git server is installed into
pub const GITEA_NAMESPACE: &str = "gitea";

/// Secret holding the Gitea admin credentials
pub const GITEA_CREDENTIAL_SECRET: &str = "gitea-credential";

/// Label selector matching git server pods
pub const GITEA_POD_SELECTOR: &str = "app=gitea";

/// Name of the git server Deployment
pub const GITEA_DEPLOYMENT: &str = "gitea";

/// Stable in-cluster DNS name the GitOps engine uses to clone
pub const GITEA_INTERNAL_URL: &str = "http://gitea-http.gitea.svc.cluster.local:3000";

/// Namespace the GitOps engine is installed into
pub const ARGOCD_NAMESPACE: &str = "argocd";

/// Secret holding the initial ArgoCD admin password
pub const ARGOCD_ADMIN_SECRET: &str = "argocd-initial-admin-secret";

/// ArgoCD admin account name
pub const ARGOCD_ADMIN_USER: &str = "admin";

/// Annotation requesting a refresh of an ArgoCD Application
pub const ARGOCD_REFRESH_ANNOTATION: &str = "argocd.argoproj.io/refresh";

/// Annotation requesting a refresh of an ArgoCD ApplicationSet
pub const ARGOCD_APPSET_REFRESH_ANNOTATION: &str = "argocd.argoproj.io/application-set-refresh";

/// Canonical default branch for seed repositories. Hard-coded so the
/// engine's targetRevision matches without configuration.
pub const DEFAULT_BRANCH: &str = "main";

/// Commit author for seed repository population
pub const GIT_AUTHOR_NAME: &str = "platform-bootstrap";

/// Commit author email for seed repository population
pub const GIT_AUTHOR_EMAIL: &str = "bootstrap@platform-bootstrap.microscaler.io";

/// Commit message used when seeding repository content
pub const GIT_COMMIT_MESSAGE: &str = "initialize platform content";

/// Canonical static admin password applied during credential rotation
pub const STATIC_ADMIN_PASSWORD: &str = "developer";

/// Environment variable enabling TLS verification disablement against the
/// platform's self-signed ingress certificates
pub const LOCAL_DEV_ENV: &str = "LOCAL_DEV";

/// State directory name under the user's home for provisioning collaborators
pub const STATE_DIR: &str = ".platform-bootstrap";
