use serde::Deserialize;

/// Raw values are kept as strings so that malformed ones can be reported
/// with their context.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CheckInQuery {
    /// A class ID or `all`. Without it the view is only shown.
    pub class_id: Option<String>,
    pub dependent_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CsvQuery {
    pub report: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}
