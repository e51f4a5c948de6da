use crate::config::{AnalyzerConfig, ApiKey};
use crate::contract::parse_response;
use crate::data_url::DataUrl;
use crate::error::{AnalysisError, ImageError};
use crate::landmarks::{AnalysisResult, ViewType};
use crate::retry::{Sleeper, ThreadSleeper};

/// Before/after photos of one view, as sent to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewImages {
    pub view_type: ViewType,
    pub before: DataUrl,
    pub after: DataUrl,
}

impl ViewImages {
    pub fn new(view_type: ViewType, before: DataUrl, after: DataUrl) -> Self {
        Self {
            view_type,
            before,
            after,
        }
    }

    /// Build from two `data:` URLs as produced by the browser or by
    /// [`crate::PreparedPhoto::to_data_url`].
    pub fn from_urls(view_type: ViewType, before: &str, after: &str) -> Result<Self, ImageError> {
        Ok(Self::new(view_type, DataUrl::parse(before)?, DataUrl::parse(after)?))
    }
}

/// One analysis call: a required first view and an optional second one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub view_a: ViewImages,
    pub view_b: Option<ViewImages>,
}

impl AnalysisRequest {
    pub fn views(&self) -> impl Iterator<Item = &ViewImages> {
        std::iter::once(&self.view_a).chain(self.view_b.as_ref())
    }
}

/// The external model. Returns the raw response text for one attempt.
///
/// Implementations classify their own failures: network and 5xx-class
/// errors as [`AnalysisError::TransientFailure`], quota exhaustion as
/// [`AnalysisError::RateLimited`].
pub trait AnalysisBackend {
    fn generate(
        &self,
        request: &AnalysisRequest,
        api_key: &ApiKey,
    ) -> Result<String, AnalysisError>;
}

/// Credential check, retry, and response validation around a backend.
pub struct Analyzer {
    config: AnalyzerConfig,
    backend: Box<dyn AnalysisBackend>,
    sleeper: Box<dyn Sleeper>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig, backend: Box<dyn AnalysisBackend>) -> Self {
        Self {
            config,
            backend,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Analyzer using the built-in Gemini transport.
    #[cfg(feature = "gemini")]
    pub fn gemini(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        let backend = crate::gemini_backend::GeminiBackend::new(&config)?;
        Ok(Self::new(config, Box::new(backend)))
    }

    /// Replace the sleeper used between retries.
    pub fn sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        view_a: ViewImages,
        view_b: Option<ViewImages>,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_request(&AnalysisRequest { view_a, view_b })
    }

    /// Run one analysis. Fails with [`AnalysisError::MissingCredential`]
    /// before any attempt when the configured key is unusable.
    pub fn analyze_request(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        let api_key = self.config.credential()?;

        log::debug!(
            "analyzing {} view(s) with {}",
            request.views().count(),
            self.config.model
        );

        let text = self
            .config
            .retry
            .run(self.sleeper.as_ref(), |_| self.backend.generate(request, api_key))?;

        let result = parse_response(
            &text,
            request.view_a.view_type,
            request.view_b.as_ref().map(|v| v.view_type),
        )?;

        log::info!(
            "analysis complete: overall {} -> {}",
            result.overall_before_score,
            result.overall_after_score
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::tests::response_json;
    use crate::retry::tests::RecordingSleeper;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    /// Replays a scripted sequence of outcomes and counts calls.
    struct ScriptedBackend {
        outcomes: RefCell<Vec<Result<String, AnalysisError>>>,
        calls: Rc<Cell<u32>>,
    }

    impl ScriptedBackend {
        fn new(mut outcomes: Vec<Result<String, AnalysisError>>, calls: Rc<Cell<u32>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: RefCell::new(outcomes),
                calls,
            }
        }
    }

    impl AnalysisBackend for ScriptedBackend {
        fn generate(
            &self,
            _request: &AnalysisRequest,
            _api_key: &ApiKey,
        ) -> Result<String, AnalysisError> {
            self.calls.set(self.calls.get() + 1);
            self.outcomes
                .borrow_mut()
                .pop()
                .unwrap_or_else(|| Err(AnalysisError::TransientFailure("script exhausted".into())))
        }
    }

    /// Shares its recorded waits with the test after being boxed.
    struct SharedSleeper(Rc<RecordingSleeper>);

    impl Sleeper for SharedSleeper {
        fn sleep(&self, duration: Duration) {
            self.0.sleep(duration);
        }
    }

    fn images(view_type: ViewType) -> ViewImages {
        ViewImages::new(
            view_type,
            DataUrl::new("image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xD9]),
            DataUrl::new("image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xD9]),
        )
    }

    fn transient() -> Result<String, AnalysisError> {
        Err(AnalysisError::TransientFailure("503".into()))
    }

    fn analyzer(
        config: AnalyzerConfig,
        outcomes: Vec<Result<String, AnalysisError>>,
    ) -> (Analyzer, Rc<Cell<u32>>, Rc<RecordingSleeper>) {
        let calls = Rc::new(Cell::new(0));
        let sleeper = Rc::new(RecordingSleeper::default());
        let backend = ScriptedBackend::new(outcomes, calls.clone());
        let analyzer = Analyzer::new(config, Box::new(backend))
            .sleeper(Box::new(SharedSleeper(sleeper.clone())));
        (analyzer, calls, sleeper)
    }

    #[test]
    fn missing_credential_makes_no_attempt() {
        let (analyzer, calls, _) =
            analyzer(AnalyzerConfig::default(), vec![Ok(response_json(false).to_string())]);
        let result = analyzer.analyze(images(ViewType::Side), None);
        assert_eq!(result, Err(AnalysisError::MissingCredential));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn malformed_credential_makes_no_attempt() {
        let (analyzer, calls, _) = analyzer(AnalyzerConfig::with_api_key("undefined"), vec![]);
        assert_eq!(
            analyzer.analyze(images(ViewType::Side), None),
            Err(AnalysisError::MissingCredential)
        );
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn recovers_after_two_transient_failures() {
        let (analyzer, calls, sleeper) = analyzer(
            AnalyzerConfig::with_api_key("AIzaSyExample"),
            vec![transient(), transient(), Ok(response_json(false).to_string())],
        );
        let result = analyzer.analyze(images(ViewType::Side), None).unwrap();
        assert_eq!(result.view_a.view_type, ViewType::Side);
        assert_eq!(calls.get(), 3);
        assert_eq!(
            *sleeper.waits.borrow(),
            vec![Duration::from_millis(2000), Duration::from_millis(3000)]
        );
    }

    #[test]
    fn surfaces_transient_failure_after_retries() {
        let (analyzer, calls, _) = analyzer(
            AnalyzerConfig::with_api_key("AIzaSyExample"),
            vec![transient(), transient(), transient(), Ok(response_json(false).to_string())],
        );
        assert!(matches!(
            analyzer.analyze(images(ViewType::Front), None),
            Err(AnalysisError::TransientFailure(_))
        ));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn rate_limit_is_surfaced_without_retry() {
        let (analyzer, calls, sleeper) = analyzer(
            AnalyzerConfig::with_api_key("AIzaSyExample"),
            vec![Err(AnalysisError::RateLimited)],
        );
        let err = analyzer.analyze(images(ViewType::Front), None).unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(calls.get(), 1);
        assert!(sleeper.waits.borrow().is_empty());
    }

    #[test]
    fn empty_text_is_not_retried() {
        let (analyzer, calls, _) = analyzer(
            AnalyzerConfig::with_api_key("AIzaSyExample"),
            vec![Ok(String::new()), Ok(response_json(false).to_string())],
        );
        assert_eq!(
            analyzer.analyze(images(ViewType::Front), None),
            Err(AnalysisError::EmptyResponse)
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn second_view_is_carried_through() {
        let (analyzer, _, _) = analyzer(
            AnalyzerConfig::with_api_key("AIzaSyExample"),
            vec![Ok(response_json(true).to_string())],
        );
        let result = analyzer
            .analyze(images(ViewType::Front), Some(images(ViewType::Side)))
            .unwrap();
        assert_eq!(result.view_a.view_type, ViewType::Front);
        assert_eq!(result.view_b.map(|v| v.view_type), Some(ViewType::Side));
    }

    #[test]
    fn request_lists_views_in_order() {
        let request = AnalysisRequest {
            view_a: images(ViewType::Front),
            view_b: Some(images(ViewType::Side)),
        };
        let kinds: Vec<ViewType> = request.views().map(|v| v.view_type).collect();
        assert_eq!(kinds, vec![ViewType::Front, ViewType::Side]);
    }
}
