//! Unit tests for error types and conversions

use kcpvisor_core::error::{
    ConfigError, ExtractError, FetchError, KcpvisorError, LocateError, ProcessError,
};

#[test]
fn test_fetch_error_display() {
    let error = FetchError::NoMatchingAsset {
        marker: "-linux-amd64-".to_string(),
        tag: "v20230101".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "No release asset matches platform marker \"-linux-amd64-\" (release v20230101)"
    );

    let error = FetchError::Timeout { seconds: 300 };
    assert_eq!(error.to_string(), "Request timeout after 300 seconds");
}

#[test]
fn test_extract_error_display() {
    let error = ExtractError::UnsupportedEntry {
        type_code: '2',
        name: "client_link".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Unsupported archive entry type '2' for client_link"
    );
}

#[test]
fn test_process_error_display() {
    let error = ProcessError::AlreadyRunning { pid: Some(4242) };
    assert_eq!(error.to_string(), "kcptun is already running (pid Some(4242))");

    let error = ProcessError::LaunchFailure {
        binary: "bin/client_linux_amd64".to_string(),
        reason: "permission denied".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Failed to launch bin/client_linux_amd64: permission denied"
    );
}

#[test]
fn test_locate_error_display() {
    let error = LocateError::NotFound {
        path: "bin/client_darwin_amd64".to_string(),
    };
    assert_eq!(error.to_string(), "Binary not found at bin/client_darwin_amd64");
}

#[test]
fn test_kcpvisor_error_from_components() {
    let error: KcpvisorError = ConfigError::ValidationError {
        message: "bad".to_string(),
    }
    .into();
    assert!(matches!(error, KcpvisorError::Config(_)));

    let error: KcpvisorError = FetchError::Http {
        reason: "connection refused".to_string(),
    }
    .into();
    assert!(matches!(error, KcpvisorError::Fetch(_)));
    assert_eq!(
        error.to_string(),
        "Fetch error: HTTP request failed: connection refused"
    );

    let error: KcpvisorError = ExtractError::NoBinary {
        marker: "client_".to_string(),
    }
    .into();
    assert!(matches!(error, KcpvisorError::Extract(_)));

    let error: KcpvisorError = ProcessError::TerminateFailure {
        pid: 7,
        reason: "ESRCH".to_string(),
    }
    .into();
    assert!(matches!(error, KcpvisorError::Process(_)));
}

#[test]
fn test_kcpvisor_error_from_io() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: KcpvisorError = io_error.into();
    assert!(matches!(error, KcpvisorError::Io(_)));
}

#[test]
fn test_kcpvisor_error_from_toml() {
    let toml_error: toml::de::Error =
        toml::from_str::<serde_json::Value>("invalid toml").unwrap_err();
    let error: KcpvisorError = toml_error.into();
    assert!(matches!(error, KcpvisorError::Toml(_)));
}
