use url::Url;

/// Convenience wrapper for URL generation functions.
#[derive(Clone, Debug)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,
}

impl Urls {
    pub fn new(base: impl AsRef<str>) -> Self {
        let base =
            Url::parse(base.as_ref()).unwrap_or_else(|_| panic!("parse {} as URL", base.as_ref()));

        Urls { base }
    }

    pub fn login(&self) -> Url {
        self.base.join("auth/login").expect("get login URL")
    }

    /// The login page, remembering where to go afterwards.
    pub fn login_then(&self, next: &str) -> Url {
        let mut url = self.login();
        url.query_pairs_mut().append_pair("next", next);
        url
    }

    pub fn check_in(&self) -> Url {
        self.base.join("classes/check-in").expect("get check-in URL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirects_keep_the_destination() {
        let urls = Urls::new("https://dojo.example.com/");
        let url = urls.login_then("/classes/check-in?class_id=all");

        assert_eq!(url.path(), "/auth/login");
        assert_eq!(
            url.query_pairs().next().map(|(k, v)| (k.into_owned(), v.into_owned())),
            Some(("next".to_owned(), "/classes/check-in?class_id=all".to_owned()))
        );
        assert_eq!(urls.check_in().as_str(), "https://dojo.example.com/classes/check-in");
    }
}
