use std::path::PathBuf;

use varwise_view::Error;

#[test]
fn test_error_display() {
    let err = Error::Config("test error".to_string());
    assert_eq!(format!("{}", err), "Configuration error: test error");
}

#[test]
fn test_missing_data_points_at_acquisition() {
    let err = Error::CatalogUnavailable(PathBuf::from("/srv/varwise/pure_catalog.csv"));
    assert_eq!(
        err.to_string(),
        "Catalog file not found at /srv/varwise/pure_catalog.csv. Please run the CLI to acquire data first."
    );
}

#[test]
fn test_filter_errors_are_client_errors() {
    for err in [
        Error::InvalidFilterSyntax("a >> 1".to_string()),
        Error::UnknownColumn("a".to_string()),
        Error::UnsupportedStringOperator("a>\"x\"".to_string()),
    ] {
        assert!(err.is_filter_error());
        assert!(err.is_client_error());
    }
    assert!(!Error::InvalidPagination("Invalid parameters".to_string()).is_filter_error());
}
