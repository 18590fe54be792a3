//! End-to-end parse/save/parse tests over the structural core.

use std::collections::BTreeSet;

use pdf_spine::{
    filters, Dictionary, Document, Error, Object, ObjectId, SaveOptions, Version, XrefStyle,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Build a document with a catalog, a pages node, and extras.
fn sample_document() -> Document {
    init_logs();
    let mut document = Document::new(Version::V1_7);
    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name("Pages".to_string()));
    pages.set("Kids", Object::Array(Vec::new()));
    pages.set("Count", Object::Integer(0));
    let pages_id = document.add_object(Object::Dictionary(pages)).unwrap();

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name("Catalog".to_string()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = document.add_object(Object::Dictionary(catalog)).unwrap();
    document
        .trailer_mut()
        .dict
        .set("Root", Object::Reference(catalog_id));
    document
}

/// Assemble a classic-xref file with computed offsets.
fn build_classic_pdf(objects: &[(u32, &str)], root: u32) -> Vec<u8> {
    let mut buf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (number, body) in objects {
        offsets.push(buf.len());
        buf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", number, body).as_bytes());
    }
    let xref_pos = buf.len();
    buf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        buf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    buf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            root,
            xref_pos
        )
        .as_bytes(),
    );
    buf
}

/// Append a cross-reference-stream update section.
///
/// `entries` are `(object number, type, field2, field3)` rows for the
/// objects this section covers; the stream's own entry is added here.
fn append_xref_stream_update(
    buf: &mut Vec<u8>,
    number: u32,
    mut entries: Vec<(u32, u8, u64, u32)>,
    prev: Option<u64>,
    size: u32,
) -> u64 {
    let position = buf.len() as u64;
    entries.push((number, 1, position, 0));
    entries.sort_by_key(|e| e.0);

    let mut rows = Vec::new();
    for (_, entry_type, field2, field3) in &entries {
        rows.push(*entry_type);
        rows.extend_from_slice(&(*field2 as u32).to_be_bytes());
        rows.extend_from_slice(&(*field3 as u16).to_be_bytes());
    }

    let mut index = String::new();
    let mut run_start = 0usize;
    for i in 1..=entries.len() {
        if i == entries.len() || entries[i].0 != entries[i - 1].0 + 1 {
            index.push_str(&format!("{} {} ", entries[run_start].0, i - run_start));
            run_start = i;
        }
    }

    let payload = filters::flate_encode(&filters::png_up_encode(&rows, 7));
    let prev_entry = prev.map(|p| format!("/Prev {} ", p)).unwrap_or_default();
    buf.extend_from_slice(
        format!(
            "{} 0 obj\n<< /Type /XRef /Size {} /W [1 4 2] /Index [{}] /Root 1 0 R {}\
             /Filter /FlateDecode /DecodeParms << /Columns 7 /Predictor 12 >> /Length {} >>\nstream\n",
            number,
            size,
            index.trim_end(),
            prev_entry,
            payload.len()
        )
        .as_bytes(),
    );
    buf.extend_from_slice(&payload);
    buf.extend_from_slice(b"\nendstream\nendobj\n");
    buf.extend_from_slice(format!("startxref\n{}\n%%EOF\n", position).as_bytes());
    position
}

/// Collect every object number reachable from the catalog.
fn reachable_numbers(document: &Document) -> BTreeSet<u32> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![document.catalog().unwrap()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id.number) {
            continue;
        }
        let value = match document.resolve(id) {
            Some(v) => v.clone(),
            None => continue,
        };
        collect_refs(&value, &mut stack);
    }
    seen
}

fn collect_refs(value: &Object, out: &mut Vec<ObjectId>) {
    match value {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|v| collect_refs(v, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, v)| collect_refs(v, out)),
        Object::Stream(stream) => stream.dict.iter().for_each(|(_, v)| collect_refs(v, out)),
        _ => {}
    }
}

#[test]
fn classic_round_trip_preserves_structure() {
    let mut document = sample_document();
    let mut extras = Dictionary::new();
    extras.set("Zebra", Object::Integer(1));
    extras.set("Alpha", Object::Real(-0.25));
    extras.set("Mango", Object::String(b"text".to_vec(), pdf_spine::StringEncoding::Raw));
    let extras_id = document.add_object(Object::Dictionary(extras)).unwrap();

    let mut out = Vec::new();
    document.save(&mut out).unwrap();

    let reopened = Document::open(out).unwrap();
    assert_eq!(reopened.trailer_count(), 1);
    assert!(reopened.is_flattened());

    // Key order survives parse -> serialize -> parse.
    let dict = reopened.resolve(extras_id).unwrap().as_dict().unwrap();
    let keys: Vec<&str> = dict.keys().collect();
    assert_eq!(keys, vec!["Zebra", "Alpha", "Mango"]);
    assert_eq!(dict.get_real("Alpha").unwrap(), -0.25);

    assert_eq!(reachable_numbers(&document), reachable_numbers(&reopened));
}

#[test]
fn xref_stream_round_trip_preserves_structure() {
    let mut document = sample_document();
    for value in 0..120 {
        document.add_object(Object::Integer(value)).unwrap();
    }
    let options = SaveOptions {
        xref_style: XrefStyle::Stream,
        ..SaveOptions::default()
    };
    let mut out = Vec::new();
    document.save_with(&mut out, &options).unwrap();

    // 122 compressible objects at 100 members per stream: two
    // containers, the second extending the first.
    let text = String::from_utf8_lossy(&out);
    assert!(text.contains("/Type /ObjStm"));
    assert!(text.contains("/Extends"));

    let reopened = Document::open(out).unwrap();
    assert!(reopened.trailer().is_xref_stream());
    assert_eq!(
        reopened.resolve(ObjectId::new(3, 0)),
        Some(&Object::Integer(0))
    );
    assert_eq!(
        reopened.resolve(ObjectId::new(122, 0)),
        Some(&Object::Integer(119))
    );
    assert_eq!(reachable_numbers(&document), reachable_numbers(&reopened));
}

#[test]
fn save_and_open_through_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.pdf");

    let mut document = sample_document();
    document.save_to(&path).unwrap();

    let reopened = Document::open_file(&path).unwrap();
    let catalog = reopened.catalog().unwrap();
    assert_eq!(
        reopened
            .resolve(catalog)
            .unwrap()
            .as_dict()
            .unwrap()
            .type_of(),
        Some("Catalog")
    );
}

#[test]
fn single_trailer_without_signature_flattens() {
    let buf = build_classic_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [] /Count 0 >>"),
        ],
        1,
    );
    let document = Document::open(buf).unwrap();
    assert_eq!(document.trailer_count(), 1);
    assert!(document.is_flattened());
    assert_eq!(
        document.current_table().len(),
        document.trailer().xref_table.len()
    );
}

#[test]
fn incremental_update_chain_is_kept_and_extended() {
    let mut base = build_classic_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [] /Count 0 >>"),
        ],
        1,
    );
    let first_start = base
        .windows(9)
        .rposition(|w| w == b"startxref")
        .map(|p| {
            String::from_utf8_lossy(&base[p + 9..])
                .split_whitespace()
                .next()
                .unwrap()
                .parse::<u64>()
                .unwrap()
        })
        .unwrap();

    // Hand-written second generation redefining the pages node.
    let update_obj = base.len();
    base.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 5 >>\nendobj\n");
    let update_xref = base.len();
    base.extend_from_slice(b"xref\n2 1\n");
    base.extend_from_slice(format!("{:010} 00000 n \n", update_obj).as_bytes());
    base.extend_from_slice(
        format!(
            "trailer\n<< /Size 3 /Root 1 0 R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            first_start, update_xref
        )
        .as_bytes(),
    );

    let mut document = Document::open(base.clone()).unwrap();
    assert_eq!(document.trailer_count(), 2);
    assert!(!document.is_flattened());
    let pages = ObjectId::new(2, 0);
    assert_eq!(
        document
            .resolve(pages)
            .unwrap()
            .as_dict()
            .unwrap()
            .get_integer("Count")
            .unwrap(),
        5
    );

    // Modify and save: the imported bytes stay a prefix and a third
    // generation lands behind them.
    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name("Pages".to_string()));
    pages_dict.set("Kids", Object::Array(Vec::new()));
    pages_dict.set("Count", Object::Integer(9));
    document
        .set_object(pages, Object::Dictionary(pages_dict))
        .unwrap();

    let mut out = Vec::new();
    document.save(&mut out).unwrap();
    assert!(out.starts_with(&base));

    let reopened = Document::open(out).unwrap();
    assert_eq!(reopened.trailer_count(), 3);
    assert_eq!(
        reopened
            .resolve(pages)
            .unwrap()
            .as_dict()
            .unwrap()
            .get_integer("Count")
            .unwrap(),
        9
    );
}

#[test]
fn signed_document_is_read_only_and_preserved_byte_exact() {
    let buf = build_classic_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [] /Count 0 >>"),
            (3, "<< /Type /Sig /ByteRange [0 100 200 50] /Contents <4142> >>"),
        ],
        1,
    );

    let mut document = Document::open(buf.clone()).unwrap();
    assert!(document.has_signature());
    assert!(document.is_read_only());
    assert!(matches!(
        document.add_object(Object::Null),
        Err(Error::ReadOnly)
    ));

    let mut out = Vec::new();
    document.save(&mut out).unwrap();
    assert_eq!(out, buf);
}

#[test]
fn linearized_overlay_chain_merges_top_trailer() {
    init_logs();
    let mut buf = b"%PDF-1.5\n".to_vec();
    let lin_pos = buf.len() as u64;
    buf.extend_from_slice(b"5 0 obj\n<< /Linearized 1 /L 900 /H [16 32] >>\nendobj\n");
    let cat_pos = buf.len() as u64;
    buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    let pages_pos = buf.len() as u64;
    buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");

    let start1 = append_xref_stream_update(
        &mut buf,
        6,
        vec![
            (0, 0, 0, 65535),
            (1, 1, cat_pos, 0),
            (2, 1, pages_pos, 0),
            (5, 1, lin_pos, 0),
        ],
        None,
        7,
    );

    let second_pages = buf.len() as u64;
    buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 1 >>\nendobj\n");
    let start2 = append_xref_stream_update(
        &mut buf,
        7,
        vec![(2, 1, second_pages, 0)],
        Some(start1),
        8,
    );

    let third_pages = buf.len() as u64;
    buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 2 >>\nendobj\n");
    append_xref_stream_update(&mut buf, 8, vec![(2, 1, third_pages, 0)], Some(start2), 9);

    let document = Document::open(buf).unwrap();
    // The top overlay was merged away; the chain shrank by one.
    assert_eq!(document.trailer_count(), 2);
    // Its redefinition of the pages node won.
    assert_eq!(
        document
            .resolve(ObjectId::new(2, 0))
            .unwrap()
            .as_dict()
            .unwrap()
            .get_integer("Count")
            .unwrap(),
        2
    );
    // The output is no longer linearized.
    assert!(document.linearization().is_none());
}

#[test]
fn max_object_number_tracks_mutations() {
    let mut document = sample_document();
    assert_eq!(document.max_object_number(), 2);
    let id = document.add_object(Object::Integer(1)).unwrap();
    assert_eq!(document.max_object_number(), 3);
    document.remove_object(id).unwrap();
    assert_eq!(document.max_object_number(), 3);
    let next = document.add_object(Object::Integer(2)).unwrap();
    assert_eq!(next, ObjectId::new(4, 0));
}

#[test]
fn compact_then_renumber_yields_dense_numbering() {
    let mut document = sample_document();
    for value in 0..4 {
        document.add_object(Object::Integer(value)).unwrap();
    }
    let removed = document.compact();
    assert_eq!(removed, 4);
    document.renumber().unwrap();
    let ids = document.current_table().all_references();
    assert_eq!(ids, vec![ObjectId::new(1, 0), ObjectId::new(2, 0)]);
    // Still a coherent document afterwards.
    let mut out = Vec::new();
    document.save(&mut out).unwrap();
    let reopened = Document::open(out).unwrap();
    assert_eq!(reachable_numbers(&reopened).len(), 2);
}
