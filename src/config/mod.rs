//! Configuration for extraction and capture runs
//!
//! `CaptureConfig` with a validating builder and JSON file loading.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::CaptureConfigBuilder;
pub use types::{CaptureConfig, PrintOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_capture_contract() {
        let config = CaptureConfig::default();
        assert_eq!(config.reader_ready_timeout().as_millis(), 10_000);
        assert_eq!(config.protocol_version(), "1.3");
        let print = config.print_options();
        assert!(print.print_background);
        assert_eq!(
            [print.margin_top, print.margin_bottom, print.margin_left, print.margin_right],
            [0.0; 4]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(CaptureConfig::builder().reader_ready_timeout_ms(0).build().is_err());
        assert!(CaptureConfig::builder().margins(-1.0).build().is_err());
        assert!(CaptureConfig::builder().reader_surface_uri("reader.html").build().is_err());
        assert!(CaptureConfig::builder().protocol_version(" ").build().is_err());
    }

    #[test]
    fn json_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"reader_ready_timeout_ms": 2500, "print": {{"margin_top": 0.5}}}}"#).unwrap();

        let config = CaptureConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.reader_ready_timeout().as_millis(), 2500);
        assert_eq!(config.print_options().margin_top, 0.5);
        assert!(config.print_options().print_background);
        assert!(config.headless());
    }

    #[test]
    fn invalid_json_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(CaptureConfig::from_json_file(file.path()).is_err());
    }
}
