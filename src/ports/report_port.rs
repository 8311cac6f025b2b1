//! Report generation port trait.

use std::path::Path;

use crate::domain::error::SwingError;
use crate::domain::metrics::PerformanceReport;
use crate::domain::position::ClosedTrade;

/// Port for writing trade reports.
pub trait ReportPort {
    fn write(
        &self,
        trades: &[ClosedTrade],
        report: &PerformanceReport,
        output_path: &Path,
    ) -> Result<(), SwingError>;
}
