//! Study input sources.
//!
//! Studies reach the aggregator either from the built-in reference table
//! or from `--study LABEL:MEAN_DIFF:SE` arguments on the command line.

use crate::models::StudyRecord;

/// The five-study reference table used when no studies are supplied.
pub fn reference_studies() -> Vec<StudyRecord> {
    vec![
        StudyRecord::new("Study 1", 0.2, 0.1),
        StudyRecord::new("Study 2", 0.4, 0.2),
        StudyRecord::new("Study 3", 0.1, 0.15),
        StudyRecord::new("Study 4", 0.3, 0.1),
        StudyRecord::new("Study 5", 0.25, 0.12),
    ]
}

/// Parse a `LABEL:MEAN_DIFF:SE` study argument.
///
/// The label may itself contain colons; the last two fields are numeric.
/// Range checks on `SE` are left to the aggregator.
pub fn parse_study(input: &str) -> Result<StudyRecord, String> {
    let mut parts = input.rsplitn(3, ':');
    let (se, mean_diff, label) = match (parts.next(), parts.next(), parts.next()) {
        (Some(se), Some(mean_diff), Some(label)) => (se, mean_diff, label),
        _ => {
            return Err(format!(
                "expected LABEL:MEAN_DIFF:SE, got '{}'",
                input
            ))
        }
    };

    let label = label.trim();
    if label.is_empty() {
        return Err(format!("study label is empty in '{}'", input));
    }

    let mean_diff: f64 = mean_diff
        .trim()
        .parse()
        .map_err(|_| format!("invalid mean difference '{}' in '{}'", mean_diff, input))?;
    let se: f64 = se
        .trim()
        .parse()
        .map_err(|_| format!("invalid standard error '{}' in '{}'", se, input))?;

    Ok(StudyRecord::new(label, mean_diff, se))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_studies() {
        let studies = reference_studies();
        assert_eq!(studies.len(), 5);
        assert_eq!(studies[0].label, "Study 1");
        assert_eq!(studies[4].mean_diff, 0.25);
        assert!(studies.iter().all(|s| s.se > 0.0));
    }

    #[test]
    fn test_parse_study() {
        let study = parse_study("Smith 2019:0.35:0.12").unwrap();
        assert_eq!(study.label, "Smith 2019");
        assert_eq!(study.mean_diff, 0.35);
        assert_eq!(study.se, 0.12);
    }

    #[test]
    fn test_parse_study_label_with_colon() {
        let study = parse_study("Trial: arm B: -0.1 : 0.05").unwrap();
        assert_eq!(study.label, "Trial: arm B");
        assert_eq!(study.mean_diff, -0.1);
        assert_eq!(study.se, 0.05);
    }

    #[test]
    fn test_parse_study_errors() {
        assert!(parse_study("no-fields").is_err());
        assert!(parse_study("only:one").is_err());
        assert!(parse_study(":0.1:0.2").is_err());
        assert!(parse_study("x:abc:0.2").is_err());
        assert!(parse_study("x:0.1:abc").is_err());
    }

    #[test]
    fn test_parse_study_keeps_zero_se() {
        // Rejected later by the aggregator, not by the parser.
        let study = parse_study("x:0.1:0").unwrap();
        assert_eq!(study.se, 0.0);
    }
}
