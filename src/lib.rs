pub mod spam_detection;
pub mod utils;

pub use spam_detection::{
    CheckResult, Detector, DetectorConfig, FileSampleUpdater, HttpClient, HttpResponse,
    LoadResult, SampleUpdater, SpamClass,
};
