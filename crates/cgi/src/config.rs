/// How an [`Adapter`](crate::Adapter) turns an environment into requests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    title_case_headers: bool,
    trust_uploads: bool,
}

impl AdapterConfig {
    pub fn builder() -> AdapterConfigBuilder {
        AdapterConfigBuilder::new()
    }

    /// Whether header names are emitted as `Content-Type` rather than `content-type`.
    #[inline]
    pub fn title_case_headers(&self) -> bool {
        self.title_case_headers
    }

    /// Whether uploaded files may be moved from any path, not only from the ones the
    /// environment announced as uploads.
    #[inline]
    pub fn trust_uploads(&self) -> bool {
        self.trust_uploads
    }
}

#[derive(Debug)]
pub struct AdapterConfigBuilder {
    config: AdapterConfig,
}

impl AdapterConfigBuilder {
    fn new() -> Self {
        Self { config: AdapterConfig::default() }
    }

    pub fn title_case_headers(mut self, title_case: bool) -> Self {
        self.config.title_case_headers = title_case;
        self
    }

    /// Command-line tools that hand-craft upload descriptors want this; servers don't.
    pub fn trust_uploads(mut self, trust: bool) -> Self {
        self.config.trust_uploads = trust;
        self
    }

    pub fn build(self) -> AdapterConfig {
        self.config
    }
}
