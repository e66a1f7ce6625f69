use thiserror::Error;
#[derive(Debug, Error)]
pub enum DaqError {
    #[error("UL error {code}: {message}")]
    Driver { code: i32, message: String },
    #[error("failed to load driver library: {0}")]
    Library(String),
    #[error("driver library is missing symbol `{0}`")]
    MissingSymbol(&'static str),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl DaqError {
    /// Numeric code shown in the alert dialog. Only driver faults carry one.
    pub fn code(&self) -> Option<i32> {
        match self {
            DaqError::Driver { code, .. } => Some(*code),
            _ => None,
        }
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for DaqError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        DaqError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for DaqError {
    fn from(value: image::ImageError) -> Self {
        DaqError::Plot(value.to_string())
    }
}
