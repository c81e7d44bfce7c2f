use plagiarism_detector::DetectorError;
use plagiarism_domain::JobId;

/// Parse a job id taken from the request path
pub fn parse_job_id(raw: &str) -> Result<JobId, DetectorError> {
    raw.parse()
        .map_err(|e| DetectorError::validation_error("job_id", format!("'{raw}' is not a job id: {e}")))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_job_id() {
        let fixture = JobId::generate();

        let actual = parse_job_id(&fixture.to_string()).unwrap();

        assert_eq!(actual, fixture);
        assert_eq!(parse_job_id("not-a-uuid").unwrap_err().error_code(), "VALIDATION_ERROR");
    }
}
