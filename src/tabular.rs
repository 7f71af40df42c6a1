use crate::domain::{RunRecord, SampleAttributes, normalize_attribute_name, parse_count};

const SEPARATOR: char = ',';
const QUOTE: char = '"';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularRow {
    fields: Vec<(String, String)>,
}

impl TabularRow {
    /// Value of the named column; with duplicate headers the last one wins.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub fn parse_rows(content: &str) -> Vec<TabularRow> {
    let mut lines = content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers = tokenize(header_line);

    lines
        .map(|line| {
            let mut values = tokenize(line).into_iter();
            let fields = headers
                .iter()
                .map(|header| (header.clone(), values.next().unwrap_or_default()))
                .collect();
            TabularRow { fields }
        })
        .collect()
}

pub fn tokenize(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            QUOTE => in_quotes = !in_quotes,
            SEPARATOR if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

const RUN_ACCESSION: &[&str] = &["Run", "run_accession"];
const SAMPLE_ACCESSION: &[&str] = &["BioSample", "sample_accession"];
const SAMPLE_ALIAS: &[&str] = &["Sample Name", "sample_alias"];
const SAMPLE_TITLE: &[&str] = &["sample_title"];
const EXPERIMENT_TITLE: &[&str] = &["Experiment", "experiment_title"];
const LIBRARY_LAYOUT: &[&str] = &["LibraryLayout", "library_layout"];
const LIBRARY_STRATEGY: &[&str] = &["LibraryStrategy", "library_strategy"];
const LIBRARY_SOURCE: &[&str] = &["LibrarySource", "library_source"];
const LIBRARY_SELECTION: &[&str] = &["LibrarySelection", "library_selection"];
const INSTRUMENT_PLATFORM: &[&str] = &["Platform", "instrument_platform"];
const INSTRUMENT_MODEL: &[&str] = &["Model", "instrument_model"];
const READ_COUNT: &[&str] = &["spots", "read_count"];
const BASE_COUNT: &[&str] = &["bases", "base_count"];
const SCIENTIFIC_NAME: &[&str] = &["Organism", "scientific_name"];
const TAX_ID: &[&str] = &["TaxID", "tax_id"];

const IGNORED_COLUMNS: &[&str] = &[
    "Bytes",
    "AvgSpotLen",
    "Consent",
    "DATASTORE_filetype",
    "DATASTORE_provider",
    "DATASTORE_region",
    "Assay Type",
    "BioProject",
    "Center Name",
    "SRA Study",
    "ReleaseDate",
];

const MAPPED_COLUMNS: &[&[&str]] = &[
    RUN_ACCESSION,
    SAMPLE_ACCESSION,
    SAMPLE_ALIAS,
    SAMPLE_TITLE,
    EXPERIMENT_TITLE,
    LIBRARY_LAYOUT,
    LIBRARY_STRATEGY,
    LIBRARY_SOURCE,
    LIBRARY_SELECTION,
    INSTRUMENT_PLATFORM,
    INSTRUMENT_MODEL,
    READ_COUNT,
    BASE_COUNT,
    SCIENTIFIC_NAME,
    TAX_ID,
];

pub fn is_recognized_column(column: &str) -> bool {
    IGNORED_COLUMNS.contains(&column)
        || MAPPED_COLUMNS
            .iter()
            .any(|aliases| aliases.contains(&column))
}

pub fn row_to_run(row: &TabularRow) -> RunRecord {
    let text = |aliases: &[&str]| first_present(row, aliases).unwrap_or_default().to_string();
    let count = |aliases: &[&str]| first_present(row, aliases).and_then(parse_count);

    let mut attributes = SampleAttributes::new();
    for (column, value) in row.iter() {
        if value.is_empty() || is_recognized_column(column) {
            continue;
        }
        attributes.insert(normalize_attribute_name(column), value.to_string());
    }

    RunRecord {
        run_accession: text(RUN_ACCESSION),
        sample_accession: text(SAMPLE_ACCESSION),
        sample_alias: text(SAMPLE_ALIAS),
        sample_title: text(SAMPLE_TITLE),
        experiment_title: text(EXPERIMENT_TITLE),
        library_layout: text(LIBRARY_LAYOUT),
        library_strategy: text(LIBRARY_STRATEGY),
        library_source: text(LIBRARY_SOURCE),
        library_selection: text(LIBRARY_SELECTION),
        instrument_platform: text(INSTRUMENT_PLATFORM),
        instrument_model: text(INSTRUMENT_MODEL),
        read_count: count(READ_COUNT),
        base_count: count(BASE_COUNT),
        scientific_name: text(SCIENTIFIC_NAME),
        tax_id: text(TAX_ID),
        sample_attributes: (!attributes.is_empty()).then_some(attributes),
    }
}

pub fn parse_runs(content: &str) -> Vec<RunRecord> {
    parse_rows(content).iter().map(row_to_run).collect()
}

fn first_present<'a>(row: &'a TabularRow, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| row.get(alias))
        .find(|value| !value.is_empty())
}
