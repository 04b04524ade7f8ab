use url::Url;
use uuid::Uuid;

/// Convenience wrapper for URL generation functions.
#[derive(Clone)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,

    /// Path segment all API routes live under.
    pub(crate) api_path: String,

    /// Prefix for individual tutorials, with a trailing slash.
    tutorials_prefix: String,
}

impl Urls {
    /// Create a new instance. `api_path` should *not* include a trailing slash.
    pub fn new(base: impl AsRef<str>, api_path: impl Into<String>) -> Self {
        let base =
            Url::parse(base.as_ref()).unwrap_or_else(|_| panic!("parse {} as URL", base.as_ref()));
        let api_path = api_path.into();
        let tutorials_prefix = format!("{}/tutorials/id/", api_path);

        Urls {
            base,
            api_path,
            tutorials_prefix,
        }
    }

    pub fn tutorials(&self) -> Url {
        self.base
            .join(&self.tutorials_prefix)
            .expect("get tutorials URL")
    }

    pub fn tutorial(&self, id: &Uuid) -> Url {
        let id = format!("{}", id);
        self.tutorials()
            .join(&id)
            .unwrap_or_else(|_| panic!("get URL for tutorial {}", id))
    }
}
