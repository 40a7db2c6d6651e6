#![allow(missing_docs)]

use std::cmp::Ordering;

use pagebridge::page::checked::{CheckedPageReader, CheckedPageWriter, InputFragment, OutputFragment};
use pagebridge::page::raw::{RawPageReader, RawPageWriter};
use pagebridge::page::{PageInput, PageOutput};
use pagebridge::transport::{FragmentPool, FragmentQueue, OwnedRawSource, RawArena, RawCollector};
use proptest::prelude::*;

const CAPACITY: usize = 256;
const MAX_PAGES: usize = 12;

#[derive(Clone, Debug)]
enum Field {
    Bool(bool),
    U8(u8),
    I16(i16),
    U32(u32),
    I64(i64),
    F64(f64),
    Utf(String),
    Chars(String),
    Slice(Vec<u8>),
}

#[derive(Clone, Debug)]
struct Page {
    key: Vec<Field>,
    value: Vec<Field>,
}

fn arb_field() -> impl Strategy<Value = Field> {
    prop_oneof![
        any::<bool>().prop_map(Field::Bool),
        any::<u8>().prop_map(Field::U8),
        any::<i16>().prop_map(Field::I16),
        any::<u32>().prop_map(Field::U32),
        any::<i64>().prop_map(Field::I64),
        any::<f64>().prop_map(Field::F64),
        "[a-z\u{e9}]{0,3}".prop_map(Field::Utf),
        "[a-z]{0,4}".prop_map(Field::Chars),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Field::Slice),
    ]
}

fn arb_pages(keyed: bool) -> impl Strategy<Value = Vec<Page>> {
    let key_fields = if keyed { 1..3usize } else { 0..1usize };
    let page = (
        prop::collection::vec(arb_field(), key_fields),
        prop::collection::vec(arb_field(), 0..3),
    )
        .prop_map(|(key, value)| Page { key, value });
    prop::collection::vec(page, 0..40)
}

fn write_field<O: PageOutput>(out: &mut O, field: &Field) {
    let written = match field {
        Field::Bool(v) => out.write_bool(*v),
        Field::U8(v) => out.write_u8(*v),
        Field::I16(v) => out.write_i16(*v),
        Field::U32(v) => out.write_u32(*v),
        Field::I64(v) => out.write_i64(*v),
        Field::F64(v) => out.write_f64(*v),
        Field::Utf(s) => out.write_utf(s),
        Field::Chars(s) => out.write_chars(s),
        Field::Slice(bytes) => out.write_slice(bytes),
    };
    written.unwrap();
}

fn check_field<I: PageInput>(input: &mut I, field: &Field) {
    match field {
        Field::Bool(v) => assert_eq!(input.read_bool().unwrap(), *v),
        Field::U8(v) => assert_eq!(input.read_u8().unwrap(), *v),
        Field::I16(v) => assert_eq!(input.read_i16().unwrap(), *v),
        Field::U32(v) => assert_eq!(input.read_u32().unwrap(), *v),
        Field::I64(v) => assert_eq!(input.read_i64().unwrap(), *v),
        Field::F64(v) => assert_eq!(input.read_f64().unwrap().to_bits(), v.to_bits()),
        Field::Utf(s) => assert_eq!(&input.read_utf().unwrap(), s),
        Field::Chars(s) => {
            for unit in s.encode_utf16() {
                assert_eq!(input.read_char().unwrap(), unit);
            }
        }
        Field::Slice(bytes) => {
            let mut buf = vec![0u8; bytes.len()];
            input.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, bytes);
        }
    }
}

fn write_pages<O: PageOutput>(out: &mut O, pages: &[Page], keyed: bool) {
    for page in pages {
        for field in &page.key {
            write_field(out, field);
        }
        if keyed {
            out.end_key().unwrap();
        }
        for field in &page.value {
            write_field(out, field);
        }
        out.end_page().unwrap();
    }
    out.flush(true).unwrap();
}

fn write_checked(pages: &[Page], keyed: bool, factor: f32) -> Vec<OutputFragment> {
    let pool = FragmentPool::new(CAPACITY, MAX_PAGES, keyed);
    let mut out = CheckedPageWriter::with_flush_factor(pool, factor).unwrap();
    write_pages(&mut out, pages, keyed);
    out.into_sink().take_delivered()
}

fn write_raw(pages: &[Page], keyed: bool, factor: f32) -> Vec<OutputFragment> {
    let arena = RawArena::new(CAPACITY, MAX_PAGES, keyed).with_slack(64);
    let mut out = RawPageWriter::with_flush_factor(RawCollector::new(arena), factor).unwrap();
    write_pages(&mut out, pages, keyed);
    out.into_sink().into_fragments()
}

fn inputs(fragments: Vec<OutputFragment>) -> Vec<InputFragment> {
    fragments.into_iter().map(OutputFragment::into_input).collect()
}

fn checked_reader(fragments: &[InputFragment]) -> CheckedPageReader<FragmentQueue> {
    CheckedPageReader::new(FragmentQueue::new(fragments.to_vec()))
}

fn raw_reader(fragments: &[InputFragment]) -> RawPageReader<OwnedRawSource> {
    RawPageReader::new(OwnedRawSource::new(fragments.to_vec()))
}

fn read_pages<I: PageInput>(input: &mut I, pages: &[Page]) {
    for page in pages {
        assert!(input.next_page());
        for field in page.key.iter().chain(&page.value) {
            check_field(input, field);
        }
        assert!(!input.has_remaining());
    }
    assert!(!input.next_page());
}

/// Orders each page against its successor, before and after skipping a byte.
fn neighbour_orders<I: PageInput>(mut a: I, mut b: I) -> Vec<Ordering> {
    let mut orders = Vec::new();
    if !b.next_page() {
        return orders;
    }
    while a.next_page() && b.next_page() {
        orders.push(a.compare_page(&b));
        orders.push(b.compare_page(&a));
        if a.skip_bytes(1) == 1 {
            orders.push(a.compare_page(&b));
        }
    }
    orders
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn backends_write_identical_batches(
        (keyed, pages) in any::<bool>().prop_flat_map(|keyed| (Just(keyed), arb_pages(keyed))),
        factor in 0.5f32..0.8,
    ) {
        let checked = write_checked(&pages, keyed, factor);
        let raw = write_raw(&pages, keyed, factor);
        prop_assert_eq!(checked.len(), raw.len());
        for (a, b) in checked.iter().zip(&raw) {
            prop_assert_eq!(a.contents(), b.contents());
            prop_assert_eq!(a.offsets(), b.offsets());
            prop_assert_eq!(a.key_lengths(), b.key_lengths());
        }
    }

    #[test]
    fn backends_read_back_what_was_written(pages in arb_pages(false), factor in 0.5f32..0.8) {
        let fragments = inputs(write_checked(&pages, false, factor));
        read_pages(&mut checked_reader(&fragments), &pages);
        read_pages(&mut raw_reader(&fragments), &pages);
    }

    #[test]
    fn backends_agree_on_page_order(pages in arb_pages(false)) {
        let fragments = inputs(write_raw(&pages, false, 0.8));
        let checked = neighbour_orders(checked_reader(&fragments), checked_reader(&fragments));
        let raw = neighbour_orders(raw_reader(&fragments), raw_reader(&fragments));
        prop_assert_eq!(checked, raw);
    }

    #[test]
    fn byte_order_matches_slice_order(a in prop::collection::vec(any::<u8>(), 0..24),
                                      b in prop::collection::vec(any::<u8>(), 0..24)) {
        let pages = [
            Page { key: Vec::new(), value: vec![Field::Slice(a.clone())] },
            Page { key: Vec::new(), value: vec![Field::Slice(b.clone())] },
        ];
        let fragments = inputs(write_checked(&pages, false, 0.8));
        let expected = a.cmp(&b);

        let mut x = checked_reader(&fragments);
        let mut y = checked_reader(&fragments);
        prop_assert!(x.next_page() && y.next_page() && y.next_page());
        prop_assert_eq!(x.compare_page(&y), expected);

        let mut x = raw_reader(&fragments);
        let mut y = raw_reader(&fragments);
        prop_assert!(x.next_page() && y.next_page() && y.next_page());
        prop_assert_eq!(x.compare_page(&y), expected);
    }
}

#[test]
fn keyed_pages_match_across_backends() {
    let pages = vec![
        Page {
            key: vec![Field::U32(7)],
            value: vec![Field::Utf("seven".into())],
        },
        Page {
            key: vec![Field::Utf("k".into()), Field::U8(1)],
            value: Vec::new(),
        },
    ];
    let checked = write_checked(&pages, true, 0.8);
    let raw = write_raw(&pages, true, 0.8);
    assert_eq!(checked.len(), 1);
    assert_eq!(checked[0].key_lengths(), &[4, 4]);
    assert_eq!(raw[0].key_lengths(), checked[0].key_lengths());
    assert_eq!(raw[0].contents(), checked[0].contents());
    assert_eq!(checked[0].key(1), Some(&[0, 1, b'k', 1][..]));
    assert_eq!(checked[0].value(1), Some(&[][..]));
}
