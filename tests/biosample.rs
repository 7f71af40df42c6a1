use std::cell::RefCell;
use std::fs;
use std::time::{Duration, Instant};

use kira_curate::biosample::{AttributeSource, fetch_attributes, parse_biosample_xml};
use kira_curate::config::BatchSettings;
use kira_curate::error::CurateError;

/// Fails if the BioSample export stops matching the elements we read.
#[test]
fn biosample_fixture_schema() {
    let xml = fs::read_to_string("tests/fixtures/biosample_batch.xml").unwrap();
    let samples = parse_biosample_xml(&xml).unwrap();

    assert_eq!(samples.len(), 2);
    let first = &samples["SAMN37512345"];
    assert_eq!(first.len(), 5);
    assert_eq!(first["strain"], "C57BL/6J");
    assert_eq!(first["sex"], "female");
    assert_eq!(first["tissue"], "liver");
    assert_eq!(first["genotype_group"], "wild type");
    assert_eq!(first["age"], "8 weeks");
    assert_eq!(samples["SAMN37512346"]["genotype_group"], "knockout");
}

/// Answers each batch with one attribute per sample, failing the batches
/// whose 1-based index is listed in `fail`.
struct ScriptedSource {
    fail: Vec<usize>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedSource {
    fn new(fail: Vec<usize>) -> Self {
        Self {
            fail,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl AttributeSource for ScriptedSource {
    fn fetch_batch(&self, accessions: &[String]) -> Result<String, CurateError> {
        let mut calls = self.calls.borrow_mut();
        calls.push(accessions.to_vec());
        if self.fail.contains(&calls.len()) {
            return Err(CurateError::NcbiStatus {
                status: 502,
                message: "Bad Gateway".to_string(),
            });
        }
        let mut xml = String::from("<BioSampleSet>");
        for acc in accessions {
            xml.push_str(&format!(
                r#"<BioSample accession="{acc}"><Attributes><Attribute attribute_name="Source Name">{acc}-src</Attribute></Attributes></BioSample>"#
            ));
        }
        xml.push_str("</BioSampleSet>");
        Ok(xml)
    }
}

fn accessions(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("SAMN{n:05}")).collect()
}

fn settings(batch_size: usize) -> BatchSettings {
    BatchSettings {
        batch_size,
        delay: Duration::ZERO,
    }
}

#[test]
fn batches_are_bounded() {
    let source = ScriptedSource::new(Vec::new());
    let fetched = fetch_attributes(&source, &accessions(250), settings(100));

    let sizes: Vec<_> = source.calls.borrow().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![100, 100, 50]);
    assert_eq!(fetched.batches, 3);
    assert_eq!(fetched.failed_batches, 0);
    assert_eq!(fetched.attributes.len(), 250);
    assert_eq!(fetched.attributes["SAMN00007"]["source_name"], "SAMN00007-src");
}

#[test]
fn failed_batch_only_drops_its_own_samples() {
    let source = ScriptedSource::new(vec![2]);
    let ids = accessions(250);
    let fetched = fetch_attributes(&source, &ids, settings(100));

    assert_eq!(fetched.batches, 3);
    assert_eq!(fetched.failed_batches, 1);
    assert_eq!(fetched.attributes.len(), 150);
    assert!(fetched.attributes.contains_key(&ids[0]));
    assert!(fetched.attributes.contains_key(&ids[99]));
    assert!(!fetched.attributes.contains_key(&ids[100]));
    assert!(!fetched.attributes.contains_key(&ids[199]));
    assert!(fetched.attributes.contains_key(&ids[200]));
    assert!(fetched.attributes.contains_key(&ids[249]));
}

#[test]
fn unparseable_batch_counts_as_failed() {
    struct Garbage;
    impl AttributeSource for Garbage {
        fn fetch_batch(&self, _accessions: &[String]) -> Result<String, CurateError> {
            Ok("<BioSampleSet><BioSample accession=\"S1\"></Oops>".to_string())
        }
    }
    let fetched = fetch_attributes(&Garbage, &accessions(3), settings(2));
    assert_eq!(fetched.batches, 2);
    assert_eq!(fetched.failed_batches, 2);
    assert!(fetched.attributes.is_empty());
}

#[test]
fn no_samples_means_no_requests() {
    let source = ScriptedSource::new(Vec::new());
    let fetched = fetch_attributes(&source, &[], settings(100));
    assert_eq!(fetched.batches, 0);
    assert!(source.calls.borrow().is_empty());
}

#[test]
fn pause_falls_between_batches_only() {
    struct Timed(RefCell<Vec<Instant>>);
    impl AttributeSource for Timed {
        fn fetch_batch(&self, _accessions: &[String]) -> Result<String, CurateError> {
            self.0.borrow_mut().push(Instant::now());
            Ok("<BioSampleSet/>".to_string())
        }
    }

    let delay = Duration::from_millis(150);
    let source = Timed(RefCell::new(Vec::new()));
    let fetched = fetch_attributes(
        &source,
        &accessions(3),
        BatchSettings {
            batch_size: 1,
            delay,
        },
    );
    let finished = Instant::now();

    assert_eq!(fetched.batches, 3);
    let calls = source.0.borrow();
    assert_eq!(calls.len(), 3);
    assert!(calls[1] - calls[0] >= delay);
    assert!(calls[2] - calls[1] >= delay);
    assert!(finished - calls[2] < delay);
}
