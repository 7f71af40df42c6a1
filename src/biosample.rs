use std::collections::BTreeMap;
use std::thread;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::config::BatchSettings;
use crate::domain::{SampleAttributes, normalize_attribute_name};
use crate::error::CurateError;

pub type AttributeMap = BTreeMap<String, SampleAttributes>;

pub trait AttributeSource {
    fn fetch_batch(&self, accessions: &[String]) -> Result<String, CurateError>;
}

#[derive(Debug, Clone, Default)]
pub struct AttributeFetch {
    pub attributes: AttributeMap,
    pub batches: usize,
    pub failed_batches: usize,
}

pub fn fetch_attributes<S>(source: &S, accessions: &[String], settings: BatchSettings) -> AttributeFetch
where
    S: AttributeSource + ?Sized,
{
    let mut result = AttributeFetch::default();
    if accessions.is_empty() {
        return result;
    }
    let batch_size = settings.batch_size.max(1);
    let total = accessions.len().div_ceil(batch_size);
    tracing::info!(samples = accessions.len(), batches = total, "fetching BioSample attributes");

    for (index, batch) in accessions.chunks(batch_size).enumerate() {
        let number = index + 1;
        result.batches += 1;
        match fetch_one(source, batch) {
            Ok(attributes) => {
                tracing::info!(batch = number, total, samples = attributes.len(), "fetched BioSample batch");
                result.attributes.extend(attributes);
            }
            Err(err) => {
                tracing::warn!(batch = number, total, error = %err, "BioSample batch failed");
                result.failed_batches += 1;
            }
        }
        if number < total && !settings.delay.is_zero() {
            thread::sleep(settings.delay);
        }
    }
    result
}

fn fetch_one<S>(source: &S, batch: &[String]) -> Result<AttributeMap, CurateError>
where
    S: AttributeSource + ?Sized,
{
    let xml = source.fetch_batch(batch)?;
    parse_biosample_xml(&xml)
}

pub fn parse_biosample_xml(xml: &str) -> Result<AttributeMap, CurateError> {
    let mut reader = Reader::from_str(xml);
    let mut samples = AttributeMap::new();
    let mut buf = Vec::new();

    let mut current: Option<(String, SampleAttributes)> = None;
    let mut pending: Option<(String, String)> = None;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) if e.name().as_ref() == b"BioSample" => {
                current = attribute(&e, b"accession")?.map(|acc| (acc, SampleAttributes::new()));
            }
            Event::Start(e) if e.name().as_ref() == b"Attribute" && current.is_some() => {
                pending = attribute(&e, b"attribute_name")?
                    .map(|name| (normalize_attribute_name(&name), String::new()));
            }
            Event::Text(t) => {
                if let Some((_, value)) = pending.as_mut() {
                    value.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(c) => {
                if let Some((_, value)) = pending.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) if e.name().as_ref() == b"Attribute" => {
                if let (Some((name, value)), Some((_, attributes))) = (pending.take(), current.as_mut()) {
                    let value = value.trim();
                    if !value.is_empty() {
                        attributes.insert(name, value.to_string());
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == b"BioSample" => {
                if let Some((accession, attributes)) = current.take() {
                    if !attributes.is_empty() {
                        samples.insert(accession, attributes);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(samples)
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, CurateError> {
    for attr in element.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(xml_error)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn xml_error(err: impl std::fmt::Display) -> CurateError {
    CurateError::MalformedResponse(format!("BioSample XML: {err}"))
}
