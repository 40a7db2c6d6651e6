#![allow(missing_docs)]

use std::cmp::Ordering;

use pagebridge::page::checked::{InputFragment, OutputFragment};
use pagebridge::page::raw::{RawPageReader, RawPageWriter};
use pagebridge::page::{PageInput, PageOutput};
use pagebridge::transport::{OwnedRawSource, RawArena, RawCollector};
use pagebridge::types::{BridgeError, Result};

fn inputs(fragments: Vec<OutputFragment>) -> Vec<InputFragment> {
    fragments.into_iter().map(OutputFragment::into_input).collect()
}

fn reader(fragments: Vec<InputFragment>) -> RawPageReader<OwnedRawSource> {
    RawPageReader::new(OwnedRawSource::new(fragments))
}

#[test]
fn mixed_fields_survive_several_sessions() -> Result<()> {
    let arena = RawArena::new(64, 3, false);
    let mut out = RawPageWriter::with_flush_factor(RawCollector::new(arena), 0.5)?;
    for i in 0..10u16 {
        out.write_u16(i)?;
        out.write_f64(f64::from(i) / 4.0)?;
        out.write_utf("raw")?;
        out.write_bool(i % 2 == 0)?;
        out.end_page()?;
    }
    out.flush(true)?;
    let collector = out.into_sink();
    assert!(collector.is_finished());
    let fragments = collector.into_fragments();
    assert_eq!(
        fragments.iter().map(OutputFragment::page_count).collect::<Vec<_>>(),
        vec![3, 3, 3, 1]
    );

    let mut input = reader(inputs(fragments));
    let mut count = 0u16;
    while input.next_page() {
        assert_eq!(input.read_u16()?, count);
        assert_eq!(input.read_f64()?, f64::from(count) / 4.0);
        assert_eq!(input.read_utf()?, "raw");
        assert_eq!(input.read_bool()?, count % 2 == 0);
        assert!(!input.has_remaining());
        count += 1;
    }
    assert_eq!(count, 10);
    Ok(())
}

#[test]
fn address_based_offsets_read_back() -> Result<()> {
    let arena = RawArena::new(128, 8, false).with_address_base();
    let mut out = RawPageWriter::new(RawCollector::new(arena))?;
    for v in [3i64, -9, i64::MAX] {
        out.write_i64(v)?;
        out.end_page()?;
    }
    out.flush(true)?;
    let collector = out.into_sink();
    assert_ne!(collector.last_base(), 0);
    let fragments = collector.into_fragments();
    assert_eq!(fragments[0].offsets(), &[0, 8, 16, 24]);

    let mut input = reader(inputs(fragments));
    let mut seen = Vec::new();
    while input.next_page() {
        seen.push(input.read_i64()?);
    }
    assert_eq!(seen, vec![3, -9, i64::MAX]);
    Ok(())
}

#[test]
fn overflow_surfaces_when_page_closes() {
    let arena = RawArena::new(16, 8, false).with_slack(32);
    let mut out = RawPageWriter::new(RawCollector::new(arena)).unwrap();
    out.write_u64(1).unwrap();
    out.end_page().unwrap();
    out.write_u64(2).unwrap();
    out.write_u64(3).unwrap();
    out.write_u32(4).unwrap();
    match out.end_page() {
        Err(BridgeError::BufferOverflow {
            capacity,
            exceeded,
            last_page,
        }) => {
            assert_eq!(capacity, 16);
            assert_eq!(exceeded, 12);
            assert_eq!(last_page, 20);
        }
        other => panic!("expected overflow, got {other:?}"),
    }
    assert!(out.sink().fragments().is_empty());
}

#[test]
fn arena_without_slack_rejects_fields_past_its_end() -> Result<()> {
    let mut out = RawPageWriter::new(RawCollector::new(RawArena::new(16, 4, false)))?;
    assert!(matches!(
        out.write_slice(&[0xab; 65536]),
        Err(BridgeError::BufferOverflow {
            capacity: 16,
            exceeded: 65520,
            last_page: 65536,
        })
    ));
    out.write_u32(0xdead_beef)?;
    out.end_page()?;
    out.flush(true)?;
    assert!(matches!(out.write_u8(1), Err(BridgeError::NoActiveSession)));

    let mut input = reader(inputs(out.into_sink().into_fragments()));
    assert!(input.next_page());
    assert!(matches!(
        input.read_u64(),
        Err(BridgeError::PageBounds {
            requested: 8,
            remaining: 4,
        })
    ));
    assert_eq!(input.read_u32()?, 0xdead_beef);
    assert!(!input.next_page());
    Ok(())
}

#[test]
fn skip_and_rewind_stay_inside_the_page() -> Result<()> {
    let arena = RawArena::new(64, 4, false);
    let mut out = RawPageWriter::new(RawCollector::new(arena))?;
    out.write_slice(b"abcdef")?;
    out.end_page()?;
    out.write_slice(b"abd")?;
    out.end_page()?;
    out.flush(true)?;
    let fragments = inputs(out.into_sink().into_fragments());

    let mut a = reader(fragments.clone());
    let mut b = reader(fragments);
    assert!(a.next_page());
    assert!(b.next_page() && b.next_page());
    assert_eq!(a.compare_page(&b), Ordering::Less);
    assert_eq!(a.skip_bytes(100), 6);
    assert!(!a.has_remaining());
    assert_eq!(a.compare_page(&b), Ordering::Less);
    a.rewind();
    let mut head = [0u8; 3];
    a.read_exact(&mut head)?;
    assert_eq!(&head, b"abc");
    assert_eq!(a.compare_page(&b), Ordering::Greater);
    Ok(())
}
