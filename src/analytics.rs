use std::collections::HashMap;

use crate::models::{AnalyticsSummary, FileRecord, FileStatus, FileTypeSummary};

/// Ingestion does not time its steps, so this is reported as-is.
pub const PLACEHOLDER_PROCESS_TIME_SECS: f64 = 1.85;

pub fn summarize(records: &[FileRecord]) -> AnalyticsSummary {
    let totals = Totals::from_records(records.iter());

    let mut groups: HashMap<String, Vec<&FileRecord>> = HashMap::new();
    for record in records {
        groups
            .entry(record.file_type.to_uppercase())
            .or_default()
            .push(record);
    }

    let mut file_types: Vec<FileTypeSummary> = groups
        .into_iter()
        .map(|(file_type, members)| {
            let group = Totals::from_records(members.into_iter());
            FileTypeSummary {
                file_type,
                files: group.count,
                avg_size_kb: group.avg_size_kb(),
                success_rate: group.success_rate(),
            }
        })
        .collect();

    file_types.sort_by(|a, b| {
        b.files
            .cmp(&a.files)
            .then_with(|| a.file_type.cmp(&b.file_type))
    });

    AnalyticsSummary {
        total_files: totals.count,
        success_rate: totals.success_rate(),
        avg_file_size_kb: totals.avg_size_kb(),
        avg_process_time_secs: PLACEHOLDER_PROCESS_TIME_SECS,
        file_types,
    }
}

#[derive(Default)]
struct Totals {
    count: usize,
    completed: usize,
    size_kb: f64,
}

impl Totals {
    fn from_records<'a>(records: impl Iterator<Item = &'a FileRecord>) -> Self {
        records.fold(Totals::default(), |mut acc, record| {
            acc.count += 1;
            acc.size_kb += record.file_size.kb();
            if record.status == FileStatus::Completed {
                acc.completed += 1;
            }
            acc
        })
    }

    fn success_rate(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        round1(self.completed as f64 / self.count as f64 * 100.0)
    }

    fn avg_size_kb(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        round1(self.size_kb / self.count as f64)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
