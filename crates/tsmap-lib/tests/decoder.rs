mod common;

use common::{encode_prefab, road_token, test_catalog, PrefabRecord};
use tsmap_lib::{
    decode_prefab_item, decode_prefab_run, Error, ItemIssue, SectorDecoder, TemplateCatalog,
};

fn record() -> PrefabRecord {
    PrefabRecord {
        token: road_token(),
        ..PrefabRecord::default()
    }
}

#[test]
fn version_825_golden_block_size() {
    let catalog = test_catalog();
    let buffer = encode_prefab(&record(), 825);
    let expected = 0x34
        + 0x05
        + 0x18
        + 0x04
        + 2 * 0x08
        + 0x04
        + 0x01
        + 0x01
        + 2 * 0x38
        + 0x04
        + 0x04
        + 0x04;
    assert_eq!(expected, 231);
    assert_eq!(buffer.len(), expected);

    let (item, block_size) = decode_prefab_item(&buffer, 0, 825, &catalog).expect("decodes");
    assert_eq!(block_size, expected);
    assert_eq!(item.base.block_size, expected);
    assert_eq!(item.base.uid, 0x1000);
    assert_eq!(item.base.nodes, vec![0x10, 0x11]);
    assert_eq!(item.template, road_token());
    assert_eq!((item.base.x, item.base.y, item.base.z), (10.0, 2.0, -30.0));
    assert!(item.base.valid);
    assert!(item.base.issues.is_empty());
}

#[test]
fn every_epoch_consumes_exactly_its_record() {
    let catalog = test_catalog();
    let record = PrefabRecord {
        connected: vec![0x99],
        parts: 1,
        vegetation: 1,
        spheres: 1,
        origin: 1,
        ..record()
    };

    // Sizes for two nodes, one connected item and one of each optional block.
    let cases = [
        (825, 287),
        (828, 287),
        (829, 311),
        (830, 311),
        (831, 359),
        (845, 359),
        (846, 363),
        (853, 363),
        (854, 151),
        (855, 159),
        (870, 159),
    ];
    for (version, expected) in cases {
        let buffer = encode_prefab(&record, version);
        assert_eq!(buffer.len(), expected, "encoded size for {version}");

        let (item, block_size) = decode_prefab_item(&buffer, 0, version, &catalog)
            .unwrap_or_else(|err| panic!("version {version} failed: {err}"));
        assert_eq!(block_size, expected, "block size for {version}");
        assert_eq!(item.base.nodes, vec![0x10, 0x11], "nodes for {version}");
        assert_eq!(item.origin, 1, "origin for {version}");
        assert!(item.base.valid, "validity for {version}");
    }
}

#[test]
fn reslicing_a_record_decodes_the_same_item() {
    let catalog = test_catalog();
    for version in [825, 829, 831, 846, 854, 855] {
        let first = PrefabRecord {
            uid: 1,
            ..record()
        };
        let second = PrefabRecord {
            uid: 2,
            nodes: vec![7, 8, 9],
            connected: vec![1, 2],
            spheres: 3,
            ..record()
        };
        let mut buffer = encode_prefab(&first, version);
        let start = buffer.len();
        buffer.extend(encode_prefab(&second, version));

        let (item, block_size) = decode_prefab_item(&buffer, start, version, &catalog).unwrap();
        assert_eq!(start + block_size, buffer.len());

        let slice = &buffer[start..start + block_size];
        let (again, again_size) = decode_prefab_item(slice, 0, version, &catalog).unwrap();
        assert_eq!(again_size, block_size);
        assert_eq!(again, item, "version {version}");
    }
}

#[test]
fn unresolved_template_keeps_item_but_marks_it_invalid() {
    let catalog = TemplateCatalog::new();
    let buffer = encode_prefab(&record(), 831);
    let decoder = SectorDecoder::new(&catalog, "sec+0000+0000");

    let (item, block_size) = decoder.decode_prefab(&buffer, 0, 831).expect("not fatal");
    assert_eq!(block_size, buffer.len());
    assert!(!item.base.valid);
    assert_eq!(item.template, road_token());
    assert_eq!(
        item.base.issues,
        vec![ItemIssue::TemplateNotFound {
            token: "road_two".to_string(),
            raw: road_token(),
            offset: 0,
        }]
    );
}

#[test]
fn unknown_version_is_distinct_from_bounds_error() {
    let catalog = test_catalog();
    let buffer = encode_prefab(&record(), 825);

    let err = decode_prefab_item(&buffer, 0, 824, &catalog).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedFormatVersion {
            version: 824,
            offset: 0
        }
    ));

    let truncated = &buffer[..buffer.len() - 1];
    let err = decode_prefab_item(truncated, 0, 825, &catalog).unwrap_err();
    assert!(matches!(err, Error::OutOfBounds { .. }), "got {err:?}");

    let err = decode_prefab_item(&buffer, buffer.len() + 4, 825, &catalog).unwrap_err();
    assert!(matches!(err, Error::OutOfBounds { .. }));
}

#[test]
fn non_prefab_header_is_rejected() {
    let catalog = test_catalog();
    let mut buffer = encode_prefab(&record(), 854);
    buffer[..4].copy_from_slice(&0x03u32.to_le_bytes());
    let err = decode_prefab_item(&buffer, 0, 854, &catalog).unwrap_err();
    assert!(matches!(
        err,
        Error::UnexpectedItemType {
            found: 0x03,
            offset: 0
        }
    ));
}

#[test]
fn negative_count_is_rejected() {
    let catalog = test_catalog();
    let mut buffer = encode_prefab(&record(), 854);
    // header + flags + token + variant + parts count
    let node_count_at = 0x34 + 0x05 + 0x10 + 0x04;
    buffer[node_count_at..node_count_at + 4].copy_from_slice(&(-1i32).to_le_bytes());
    let err = decode_prefab_item(&buffer, 0, 854, &catalog).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidCount {
            count: -1,
            offset
        } if offset == node_count_at
    ));
}

#[test]
fn flags_block_fields() {
    let catalog = test_catalog();
    // Byte 0 bit 5: secret, byte 1: DLC guard, byte 2 bit 1: hidden.
    let record = PrefabRecord {
        flags: 0x0002_0720,
        ferry_uid: 0xFEED,
        tail: 42,
        padding: 9,
        ..record()
    };

    let (item, _) = decode_prefab_item(&encode_prefab(&record, 855), 0, 855, &catalog).unwrap();
    assert!(item.is_secret);
    assert!(item.base.hidden);
    assert_eq!(item.base.dlc_guard, 7);
    assert_eq!(item.base.flags, 0x0002_0720);
    assert_eq!(item.ferry_uid, 0xFEED);
    assert_eq!(item.padding, 42);

    // Earlier epochs have no secrecy bit or ferry uid.
    let (item, _) = decode_prefab_item(&encode_prefab(&record, 854), 0, 854, &catalog).unwrap();
    assert!(!item.is_secret);
    assert!(item.base.hidden);
    assert_eq!(item.ferry_uid, 0);
    assert_eq!(item.padding, 9);
}

#[test]
fn record_without_nodes_is_invalid() {
    let catalog = test_catalog();
    let record = PrefabRecord {
        nodes: Vec::new(),
        ..record()
    };
    let buffer = encode_prefab(&record, 846);
    let (item, block_size) = decode_prefab_item(&buffer, 0, 846, &catalog).unwrap();
    assert_eq!(block_size, buffer.len());
    assert!(!item.base.valid);
    assert_eq!(item.base.issues, vec![ItemIssue::NoNodes]);
}

#[test]
fn runs_advance_by_block_size() {
    let catalog = test_catalog();
    let mut buffer = vec![0u8; 3];
    for uid in 1..=3 {
        let record = PrefabRecord {
            uid,
            nodes: (0..uid).map(|n| 100 * uid + n).collect(),
            ..record()
        };
        buffer.extend(encode_prefab(&record, 831));
    }

    let items = decode_prefab_run(&buffer, 3, 3, 831, &catalog).expect("run decodes");
    let uids: Vec<u64> = items.iter().map(|item| item.base.uid).collect();
    assert_eq!(uids, vec![1, 2, 3]);
    assert_eq!(items[2].base.nodes, vec![300, 301, 302]);
    let total: usize = items.iter().map(|item| item.base.block_size).sum();
    assert_eq!(3 + total, buffer.len());
}

#[test]
fn failing_record_in_run_reports_index_and_offset() {
    let catalog = test_catalog();
    let first = encode_prefab(&record(), 829);
    let mut buffer = first.clone();
    buffer.extend(&first[..first.len() / 2]);

    let err = decode_prefab_run(&buffer, 0, 2, 829, &catalog).unwrap_err();
    match err {
        Error::SectorRecord {
            index,
            offset,
            source,
        } => {
            assert_eq!(index, 1);
            assert_eq!(offset, first.len());
            assert!(matches!(*source, Error::OutOfBounds { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}
