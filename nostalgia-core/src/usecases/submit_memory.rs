use super::prelude::*;
use std::ops::RangeInclusive;
use url::Url;

const MAX_BUSINESS_NAME_LEN: usize = 255;
const MAX_NOTE_LEN: usize = 2_000;
const MAX_PROOF_URL_LEN: usize = 500;
const VALID_YEARS: RangeInclusive<i32> = 1800..=2100;

fn validate(submission: &MemorySubmission) -> Result<()> {
    if submission.business_name.trim().is_empty() {
        return Err(Error::BusinessName);
    }
    if submission.business_name.chars().count() > MAX_BUSINESS_NAME_LEN {
        return Err(Error::BusinessNameLength);
    }
    for year in [submission.start_year, submission.end_year].into_iter().flatten() {
        if !VALID_YEARS.contains(&year) {
            return Err(Error::Year);
        }
    }
    if let (Some(start), Some(end)) = (submission.start_year, submission.end_year) {
        if end < start {
            return Err(Error::YearRange);
        }
    }
    if let Some(note) = &submission.note {
        if note.chars().count() > MAX_NOTE_LEN {
            return Err(Error::Note);
        }
    }
    if let Some(proof_url) = &submission.proof_url {
        if proof_url.len() > MAX_PROOF_URL_LEN {
            return Err(Error::ProofUrl);
        }
        let url = Url::parse(proof_url).map_err(|_| Error::ProofUrl)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::ProofUrl);
        }
    }
    Ok(())
}

/// Submits a memory and marks the timeline of its location as stale.
pub fn submit_memory<A, C>(api: &A, cache: &C, submission: &MemorySubmission) -> Result<Receipt>
where
    A: PinsApi + ?Sized,
    C: QueryCache + ?Sized,
{
    validate(submission)?;
    let receipt = api.submit_memory(submission)?;
    log::info!(
        "Submitted memory {} of location {}",
        receipt.id,
        submission.location_id
    );
    cache.invalidate(&QueryFilter::Exact(QueryKey::LocationDetail(
        submission.location_id,
    )));
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateways::api,
        tests::{location_detail, MockApi, MockQueryCache},
    };

    fn submission() -> MemorySubmission {
        MemorySubmission {
            location_id: 5.into(),
            business_name: "Corner Bakery".into(),
            start_year: Some(1962),
            end_year: Some(1998),
            note: Some("Best donuts in town".into()),
            proof_url: Some("https://archive.example.org/photo/1".into()),
        }
    }

    #[test]
    fn submit_and_invalidate_the_timeline() {
        let api = MockApi::default();
        let cache = MockQueryCache::default();
        cache.store_location_detail(location_detail(5), TimestampMs::from_millis(0));
        cache.store_location_detail(location_detail(6), TimestampMs::from_millis(0));

        let receipt = submit_memory(&api, &cache, &submission()).unwrap();
        assert_eq!(receipt.location_id, 5.into());
        assert_eq!(receipt.status, ReviewStatus::Pending);
        assert_eq!(api.submissions.borrow().len(), 1);
        assert!(cache.location_detail(5.into()).unwrap().invalidated);
        assert!(!cache.location_detail(6.into()).unwrap().invalidated);
    }

    #[test]
    fn reject_invalid_submissions() {
        let api = MockApi::default();
        let cache = MockQueryCache::default();

        let mut s = submission();
        s.business_name = "  ".into();
        assert!(matches!(submit_memory(&api, &cache, &s), Err(Error::BusinessName)));

        let mut s = submission();
        s.start_year = Some(2000);
        s.end_year = Some(1999);
        assert!(matches!(submit_memory(&api, &cache, &s), Err(Error::YearRange)));

        let mut s = submission();
        s.start_year = Some(1799);
        assert!(matches!(submit_memory(&api, &cache, &s), Err(Error::Year)));

        let mut s = submission();
        s.business_name = "x".repeat(256);
        assert!(matches!(
            submit_memory(&api, &cache, &s),
            Err(Error::BusinessNameLength)
        ));

        let mut s = submission();
        s.note = Some("x".repeat(2_001));
        assert!(matches!(submit_memory(&api, &cache, &s), Err(Error::Note)));

        let mut s = submission();
        s.proof_url = Some("not a url".into());
        assert!(matches!(submit_memory(&api, &cache, &s), Err(Error::ProofUrl)));

        let mut s = submission();
        s.proof_url = Some("ftp://example.org/photo".into());
        assert!(matches!(submit_memory(&api, &cache, &s), Err(Error::ProofUrl)));

        assert!(api.submissions.borrow().is_empty());
    }

    #[test]
    fn open_year_ranges_are_valid() {
        let api = MockApi::default();
        let cache = MockQueryCache::default();
        let mut s = submission();
        s.start_year = None;
        s.proof_url = None;
        assert!(submit_memory(&api, &cache, &s).is_ok());
    }

    #[test]
    fn api_errors_keep_the_cache() {
        let api = MockApi::default();
        api.fail.set(true);
        let cache = MockQueryCache::default();
        cache.store_location_detail(location_detail(5), TimestampMs::from_millis(0));
        assert!(matches!(
            submit_memory(&api, &cache, &submission()),
            Err(Error::Api(api::Error::Fetch(_)))
        ));
        assert!(!cache.location_detail(5.into()).unwrap().invalidated);
    }
}
