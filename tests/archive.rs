use std::io::Write;

use assert_matches::assert_matches;
use flate2::Compression;
use flate2::write::GzEncoder;

use kira_curate::archive::{BLOCK_SIZE, Entries, extract_text, find_member, gunzip};
use kira_curate::error::CurateError;

/// ustar-style member: header block, payload, zero padding to the block size.
fn member(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut header = vec![0u8; BLOCK_SIZE];
    header[..name.len()].copy_from_slice(name.as_bytes());
    header[100..108].copy_from_slice(b"0000644\0");
    let size = format!("{:011o}\0", payload.len());
    header[124..136].copy_from_slice(size.as_bytes());
    header[257..263].copy_from_slice(b"ustar\0");

    let mut out = header;
    out.extend_from_slice(payload);
    let padding = (BLOCK_SIZE - payload.len() % BLOCK_SIZE) % BLOCK_SIZE;
    out.extend(std::iter::repeat_n(0u8, padding));
    out
}

fn terminated(members: &[Vec<u8>]) -> Vec<u8> {
    let mut out = members.concat();
    out.extend(vec![0u8; BLOCK_SIZE * 2]);
    out
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn first_xml_member_is_returned_byte_for_byte() {
    let xml = format!(
        "<?xml version=\"1.0\"?>\n<MINiML>{}</MINiML>\n",
        "<Sample><Volume>5 \u{3bc}l</Volume></Sample>".repeat(40)
    );
    let tar = terminated(&[
        member("GSE245678_family.xml", xml.as_bytes()),
        member("GSM7000001-tbl-1.txt", b"ID_REF\tVALUE\n1\t2\n"),
        member("GSM7000002-tbl-1.txt", &vec![b'x'; 2048]),
    ]);

    let found = find_member(&tar, ".xml").unwrap();
    assert_eq!(found.name, "GSE245678_family.xml");
    assert_eq!(found.data, xml.as_bytes());
    assert_eq!(extract_text(&gzip(&tar), ".xml").unwrap(), xml);
}

#[test]
fn non_matching_members_before_the_xml_are_skipped() {
    let tar = terminated(&[
        member("GSM7000001-tbl-1.txt", &vec![b'a'; 513]),
        member("notes.xml.bak", b"skip me"),
        member("GSE1_family.xml", b"<MINiML/>"),
    ]);
    assert_eq!(extract_text(&gzip(&tar), ".xml").unwrap(), "<MINiML/>");
}

#[test]
fn missing_member_terminates_at_zero_header() {
    let tar = terminated(&[
        member("GSM1-tbl-1.txt", b"1\t2\n"),
        member("GSM2-tbl-1.txt", b"3\t4\n"),
    ]);
    let err = extract_text(&gzip(&tar), ".xml").unwrap_err();
    assert_matches!(err, CurateError::ArchiveMemberNotFound { suffix } if suffix == ".xml");
}

#[test]
fn missing_member_terminates_at_stream_end() {
    let tar = [member("GSM1-tbl-1.txt", b"1\t2\n"), member("GSM2-tbl-1.txt", b"3")].concat();
    assert_matches!(
        find_member(&tar, ".xml"),
        Err(CurateError::ArchiveMemberNotFound { .. })
    );
}

#[test]
fn entries_walk_every_header() {
    let tar = terminated(&[
        member("a.txt", b"a"),
        member("b.txt", &vec![b'b'; BLOCK_SIZE]),
        member("c.xml", b"c"),
    ]);
    let names: Vec<_> = Entries::new(&tar)
        .map(|entry| entry.unwrap().name)
        .collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.xml"]);
}

#[test]
fn corrupt_gzip_is_malformed() {
    assert_matches!(
        gunzip(b"definitely not gzip"),
        Err(CurateError::MalformedArchive(_))
    );
}
