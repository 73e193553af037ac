use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS configuration (`[cors]` section). `allowed_origins` is a list of exact
/// origins, or `["*"]` to allow any origin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn layer(&self) -> CorsLayer {
        let origin = if self.allowed_origins.iter().any(|origin| origin == "*") {
            AllowOrigin::any()
        } else {
            let origins = self
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect::<Vec<_>>();
            AllowOrigin::list(origins)
        };

        CorsLayer::new().allow_origin(origin)
    }
}
