//! Navigation and data addressing over whole in-memory FITS files.

use std::io::Cursor;

use fitsnav::{
    encode_card, locate_data, read_header, scan_all, scan_until, scan_with, Card, Error,
    ScanOptions, BLOCK_SIZE, CARD_SIZE,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn card(keyword: &str, value: &str) -> [u8; CARD_SIZE] {
    encode_card(keyword, value, None).unwrap()
}

fn end_card() -> [u8; CARD_SIZE] {
    let end = Card {
        keyword: "END".to_string(),
        value: None,
        comment: None,
    };
    end.encode().unwrap()
}

fn pad_to_block(out: &mut Vec<u8>, fill: u8) {
    let len = out.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    out.resize(len, fill);
}

/// One HDU: header cards plus END, then `data` padded to a whole block.
fn hdu(cards: &[(&str, String)], data: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = cards.iter().flat_map(|(k, v)| card(k, v)).collect();
    out.extend_from_slice(&end_card());
    pad_to_block(&mut out, b' ');
    out.extend_from_slice(data);
    pad_to_block(&mut out, 0);
    out
}

fn primary(bitpix: i64, axes: &[usize]) -> Vec<u8> {
    let mut cards = vec![
        ("SIMPLE", "T".to_string()),
        ("BITPIX", bitpix.to_string()),
        ("NAXIS", axes.len().to_string()),
    ];
    let names: Vec<String> = (1..=axes.len()).map(|i| format!("NAXIS{i}")).collect();
    for (name, n) in names.iter().zip(axes) {
        cards.push((name.as_str(), n.to_string()));
    }
    let len = (bitpix.unsigned_abs() / 8) as usize * axes.iter().product::<usize>();
    let len = if axes.is_empty() { 0 } else { len };
    hdu(&cards, &vec![7u8; len])
}

fn image_extension(bitpix: i64, naxis1: usize) -> Vec<u8> {
    let len = (bitpix.unsigned_abs() / 8) as usize * naxis1;
    hdu(
        &[
            ("XTENSION", "'IMAGE   '".to_string()),
            ("BITPIX", bitpix.to_string()),
            ("NAXIS", "1".to_string()),
            ("NAXIS1", naxis1.to_string()),
            ("PCOUNT", "0".to_string()),
            ("GCOUNT", "1".to_string()),
        ],
        &vec![1u8; len],
    )
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

#[test]
fn primary_then_32bit_extension() {
    let mut data = primary(8, &[]);
    data.extend(image_extension(32, 10));
    let layout = scan_all(&mut Cursor::new(data)).unwrap();
    assert_eq!(layout.len(), 2);

    let p = layout.primary().unwrap();
    assert!(!p.is_extension);
    assert_eq!(p.data_length, 0);

    let ext = layout.get(1).unwrap();
    assert!(ext.is_extension);
    assert_eq!(ext.data_length, 40);
    assert_eq!(ext.bytes_per_pixel(), 4);
    assert_eq!(ext.header_offset, BLOCK_SIZE as u64);
}

#[test]
fn offsets_are_block_aligned() {
    let mut data = primary(16, &[100, 37]);
    data.extend(image_extension(-64, 500));
    data.extend(image_extension(8, 3));
    let layout = scan_all(&mut Cursor::new(data.clone())).unwrap();
    assert_eq!(layout.len(), 3);
    for hdu in layout.iter() {
        assert_eq!(hdu.header_offset % BLOCK_SIZE as u64, 0);
        assert_eq!(hdu.data_offset % BLOCK_SIZE as u64, 0);
        let padded = (hdu.header_card_count * CARD_SIZE).div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        assert_eq!(hdu.header_offset + padded as u64, hdu.data_offset);
    }
    assert_eq!(layout.get(2).unwrap().end_offset(), data.len() as u64);
}

#[test]
fn consecutive_hdus_are_contiguous() {
    let mut data = primary(32, &[20, 20]);
    data.extend(image_extension(16, 2000));
    let layout = scan_all(&mut Cursor::new(data)).unwrap();
    let hdus = layout.into_hdus();
    assert_eq!(hdus[0].end_offset(), hdus[1].header_offset);
}

#[test]
fn not_fits_has_no_partial_list() {
    let mut data = primary(8, &[]);
    data[..9].copy_from_slice(b"SIMPLE = ");
    let err = scan_all(&mut Cursor::new(data)).unwrap_err();
    assert!(matches!(err.source, Error::NotFits));
    assert!(err.resolved.is_empty());
}

#[test]
fn missing_end_within_bound() {
    let mut data: Vec<u8> = card("SIMPLE", "T").to_vec();
    for i in 0..100 {
        data.extend_from_slice(&card(&format!("KEY{i}"), &i.to_string()));
    }
    let options = ScanOptions::default().max_header_cards(72);
    let err = scan_with(&mut Cursor::new(data), &options, None, |_, _| {}).unwrap_err();
    assert!(matches!(err.source, Error::MissingEnd { max_cards: 72 }));
}

#[test]
fn header_cut_mid_card() {
    let mut data = primary(8, &[]);
    data.truncate(2 * CARD_SIZE + 40);
    let err = scan_all(&mut Cursor::new(data)).unwrap_err();
    assert!(matches!(err.source, Error::TruncatedHeader));
}

#[test]
fn truncated_extension_keeps_earlier_hdus() {
    let mut data = primary(8, &[]);
    let mut ext = image_extension(32, 10);
    ext.truncate(CARD_SIZE * 3);
    data.extend(ext);
    let err = scan_all(&mut Cursor::new(data)).unwrap_err();
    assert!(matches!(err.source, Error::TruncatedHeader));
    assert_eq!(err.resolved.len(), 1);
}

#[test]
fn bintable_heap_counts() {
    let table = hdu(
        &[
            ("XTENSION", "'BINTABLE'".to_string()),
            ("BITPIX", "8".to_string()),
            ("NAXIS", "2".to_string()),
            ("NAXIS1", "12".to_string()),
            ("NAXIS2", "5".to_string()),
            ("PCOUNT", "100".to_string()),
            ("GCOUNT", "1".to_string()),
        ],
        &[0u8; 160],
    );
    let mut data = primary(8, &[]);
    data.extend(table);
    let layout = scan_all(&mut Cursor::new(data)).unwrap();
    assert_eq!(layout.get(1).unwrap().data_length, 160);
}

#[test]
fn zero_group_count_has_no_data() {
    let empty_table = hdu(
        &[
            ("XTENSION", "'BINTABLE'".to_string()),
            ("BITPIX", "8".to_string()),
            ("NAXIS", "2".to_string()),
            ("NAXIS1", "10".to_string()),
            ("NAXIS2", "5".to_string()),
            ("PCOUNT", "0".to_string()),
            ("GCOUNT", "0".to_string()),
        ],
        &[],
    );
    let mut data = primary(8, &[]);
    data.extend(empty_table);
    data.extend(image_extension(16, 25));
    let layout = scan_all(&mut Cursor::new(data)).unwrap();
    assert_eq!(layout.len(), 3);

    let table = layout.get(1).unwrap();
    assert_eq!(table.data_length, 0);
    assert_eq!(table.end_offset(), 3 * BLOCK_SIZE as u64);

    let image = layout.get(2).unwrap();
    assert_eq!(image.header_offset, 3 * BLOCK_SIZE as u64);
    assert_eq!(image.data_length, 50);
}

#[test]
fn header_cards_reported_in_order() {
    let mut data = primary(8, &[]);
    data.extend(image_extension(32, 4));
    let mut keywords: Vec<(usize, String)> = Vec::new();
    scan_with(
        &mut Cursor::new(data),
        &ScanOptions::default(),
        Some(1),
        |index, card: &Card| keywords.push((index, card.keyword.clone())),
    )
    .unwrap();
    let ext: Vec<&str> = keywords
        .iter()
        .filter(|(i, _)| *i == 1)
        .map(|(_, k)| k.as_str())
        .collect();
    assert_eq!(
        ext,
        ["XTENSION", "BITPIX", "NAXIS", "NAXIS1", "PCOUNT", "GCOUNT", "END"]
    );
}

#[test]
fn scan_until_ignores_garbage_past_target() {
    let mut data = primary(8, &[]);
    data.extend(image_extension(8, 4));
    data.extend(vec![b'#'; BLOCK_SIZE]);
    assert!(scan_all(&mut Cursor::new(data.clone())).is_err());
    let layout = scan_until(&mut Cursor::new(data), 1).unwrap();
    assert_eq!(layout.len(), 2);
}

#[test]
fn read_header_standalone() {
    let data = primary(16, &[4, 3]);
    let (cards, layout) = read_header(&mut Cursor::new(data)).unwrap();
    assert_eq!(cards.len(), 6);
    assert!(cards.last().unwrap().is_end());
    assert_eq!(layout.data_length().unwrap(), 24);
    assert_eq!(layout.axis_sizes().unwrap(), vec![4, 3]);
}

// ---------------------------------------------------------------------------
// Data addressing
// ---------------------------------------------------------------------------

#[test]
fn locate_16bit_images() {
    for (w, h) in [(1, 1), (3, 7), (1024, 3), (61, 97)] {
        let data = primary(16, &[w, h]);
        let seg = locate_data(&mut Cursor::new(data), 0).unwrap();
        assert_eq!(seg.length, (2 * w * h) as u64);
        assert_eq!(seg.offset % BLOCK_SIZE as u64, 0);
        assert_eq!(seg.bitpix_bytes, 2);
    }
}

#[test]
fn locate_extension_data() {
    let mut data = primary(16, &[10, 10]);
    data.extend(image_extension(-32, 50));
    let seg = locate_data(&mut Cursor::new(data.clone()), 1).unwrap();
    assert_eq!(seg.index, 1);
    assert_eq!(seg.length, 200);
    assert_eq!(seg.bitpix_bytes, 4);
    assert_eq!(seg.offset, 3 * BLOCK_SIZE as u64);
    let bytes = &data[seg.offset as usize..seg.end() as usize];
    assert!(bytes.iter().all(|&b| b == 1));
}

#[test]
fn locate_past_last_hdu() {
    let data = primary(8, &[4]);
    let mut cursor = Cursor::new(data.clone());
    assert!(matches!(
        locate_data(&mut cursor, 2),
        Err(Error::IndexOutOfRange { index: 2, count: 1 })
    ));
    assert_eq!(cursor.into_inner(), data);
}

#[test]
fn locate_without_data() {
    let mut data = primary(8, &[]);
    data.extend(image_extension(8, 4));
    assert!(matches!(
        locate_data(&mut Cursor::new(data), 0),
        Err(Error::NoDataSegment { index: 0 })
    ));
}
