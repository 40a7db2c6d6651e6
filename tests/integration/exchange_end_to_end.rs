#![allow(missing_docs)]

use std::cmp::Ordering;

use pagebridge::comparator::ComparatorBridge;
use pagebridge::config::{AccessMode, BufferConfig};
use pagebridge::exchange::{processor_for, EdgeInput};
use pagebridge::page::checked::{CheckedPageReader, CheckedPageWriter, InputFragment};
use pagebridge::page::{PageInput, PageOutput};
use pagebridge::record::{
    GroupReader, I32Codec, I64Codec, KeyValueWriter, OrderedI64Codec, PairCodec, StringCodec,
    ValueCodec, ValueReader, ValueWriter,
};
use pagebridge::transport::{EdgeWriter, FragmentPool, FragmentQueue};
use pagebridge::types::{EdgeKind, Result};

fn grouped(input: EdgeInput) -> (Vec<InputFragment>, Vec<InputFragment>) {
    match input {
        EdgeInput::Grouped { keys, values } => (keys, values),
        EdgeInput::Values(_) => panic!("expected grouped input"),
    }
}

fn values(input: EdgeInput) -> Vec<InputFragment> {
    match input {
        EdgeInput::Values(fragments) => fragments,
        EdgeInput::Grouped { .. } => panic!("expected value input"),
    }
}

#[test]
fn scatter_gather_groups_and_orders_values() -> Result<()> {
    let config = BufferConfig::default()
        .output_buffer_size(64)
        .records_per_buffer(4)
        .partition_count(3);
    let bridge = ComparatorBridge::default();
    let mut edge = processor_for(EdgeKind::ScatterGather, &config, &bridge, Some("lt_int64"))?;

    let upstream = CheckedPageWriter::new(FragmentPool::for_edge(&config, EdgeKind::ScatterGather))?;
    let mut writer = KeyValueWriter::new(upstream, PairCodec::new(I32Codec, I64Codec));
    let mut expected = Vec::new();
    for i in 0..40i64 {
        let record = ((i % 7) as i32, 100 - i * 3);
        writer.put(&record)?;
        expected.push(record);
    }
    let mut pool = writer.close()?.into_sink();
    assert!(pool.is_finished());
    let delivered = pool.take_delivered();
    assert!(delivered.len() > 1);
    for fragment in delivered {
        edge.add(fragment)?;
    }

    let inputs = edge.process()?;
    assert_eq!(inputs.len(), 3);
    let mut seen = Vec::new();
    for input in inputs {
        let (keys, values) = grouped(input);
        let mut reader = GroupReader::new(
            CheckedPageReader::new(FragmentQueue::new(keys)),
            CheckedPageReader::new(FragmentQueue::new(values)),
            PairCodec::new(I32Codec, I64Codec),
        );
        let mut last_key = None;
        while reader.next_group()? {
            let key = reader.group_key()?;
            assert!(last_key.map_or(true, |last| last < key), "keys sorted per partition");
            last_key = Some(key);
            let mut group = Vec::new();
            while let Some((k, v)) = reader.next_record()? {
                assert_eq!(k, key);
                group.push(v);
            }
            let mut sorted = group.clone();
            sorted.sort_unstable();
            assert_eq!(group, sorted, "values ordered by lt_int64");
            seen.extend(group.into_iter().map(|v| (key, v)));
        }
    }
    seen.sort_unstable();
    expected.sort_unstable();
    assert_eq!(seen, expected);
    Ok(())
}

type Groups = (Vec<InputFragment>, Vec<InputFragment>);

/// Sends `(key, key)` records through a single-partition scatter-gather edge.
fn gather_single_partition<C: ValueCodec<Value = i64>>(codec: C, keys: &[i64]) -> Result<Groups> {
    let config = BufferConfig::default().partition_count(1);
    let bridge = ComparatorBridge::default();
    let mut edge = processor_for(EdgeKind::ScatterGather, &config, &bridge, Some("lt_int64"))?;
    let upstream = CheckedPageWriter::new(FragmentPool::for_edge(&config, EdgeKind::ScatterGather))?;
    let mut writer = KeyValueWriter::new(upstream, PairCodec::new(codec, I64Codec));
    for &key in keys {
        writer.put(&(key, key))?;
    }
    for fragment in writer.close()?.into_sink().take_delivered() {
        edge.add(fragment)?;
    }
    let mut inputs = edge.process()?;
    assert_eq!(inputs.len(), 1);
    Ok(grouped(inputs.remove(0)))
}

fn group_keys<C: ValueCodec<Value = i64>>(codec: C, (keys, values): Groups) -> Result<Vec<i64>> {
    let mut reader = GroupReader::new(
        CheckedPageReader::new(FragmentQueue::new(keys)),
        CheckedPageReader::new(FragmentQueue::new(values)),
        PairCodec::new(codec, I64Codec),
    );
    let mut order = Vec::new();
    while reader.next_group()? {
        let key = reader.group_key()?;
        while let Some((k, v)) = reader.next_record()? {
            assert_eq!((k, v), (key, key));
        }
        order.push(key);
    }
    Ok(order)
}

const MIXED_SIGN_KEYS: [i64; 8] = [42, -300, 0, i64::MAX, -1, 5, i64::MIN, -300];

#[test]
fn ordered_keys_gather_in_numeric_order() -> Result<()> {
    let groups = gather_single_partition(OrderedI64Codec, &MIXED_SIGN_KEYS)?;
    assert_eq!(
        group_keys(OrderedI64Codec, groups.clone())?,
        vec![i64::MIN, -300, -1, 0, 5, 42, i64::MAX]
    );

    let (keys, values) = groups;
    let reader = |keys: Vec<InputFragment>, values: Vec<InputFragment>| {
        GroupReader::new(
            CheckedPageReader::new(FragmentQueue::new(keys)),
            CheckedPageReader::new(FragmentQueue::new(values)),
            PairCodec::new(OrderedI64Codec, I64Codec),
        )
    };
    let mut lower = reader(keys.clone(), values.clone());
    let mut upper = reader(keys, values);
    assert!(upper.next_group()?);
    let mut steps = 0;
    while upper.next_group()? {
        assert!(lower.next_group()?);
        assert_eq!(lower.compare_groups(&upper), Ordering::Less);
        assert_eq!(upper.compare_groups(&lower), Ordering::Greater);
        steps += 1;
    }
    assert_eq!(steps, 6);
    Ok(())
}

#[test]
fn plain_big_endian_keys_gather_negatives_last() -> Result<()> {
    let groups = gather_single_partition(I64Codec, &MIXED_SIGN_KEYS)?;
    assert_eq!(
        group_keys(I64Codec, groups)?,
        vec![0, 5, 42, i64::MAX, i64::MIN, -300, -1]
    );
    Ok(())
}

#[test]
fn one_to_one_carries_strings_across_batches() -> Result<()> {
    let config = BufferConfig::default()
        .output_buffer_size(32)
        .records_per_buffer(3);
    let bridge = ComparatorBridge::default();
    let mut edge = processor_for(EdgeKind::OneToOne, &config, &bridge, None)?;

    let words = ["page", "cursor", "", "writer", "\u{00fc}ber", "flush", "\u{4e2d}"];
    let mut writer = ValueWriter::new(EdgeWriter::open(&config, EdgeKind::OneToOne)?, StringCodec);
    for word in words {
        writer.put(&word.to_owned())?;
    }
    let fragments = writer.close()?.into_fragments();
    assert!(fragments.len() > 1);
    for fragment in fragments {
        edge.add(fragment)?;
    }

    let mut inputs = edge.process()?;
    assert_eq!(inputs.len(), 1);
    let queue = FragmentQueue::new(values(inputs.remove(0)));
    let mut reader = ValueReader::new(CheckedPageReader::new(queue), StringCodec);
    let mut seen = Vec::new();
    while let Some(word) = reader.next_record()? {
        seen.push(word);
    }
    assert_eq!(seen, words);
    Ok(())
}

#[test]
fn broadcast_feeds_every_receiver_from_a_raw_writer() -> Result<()> {
    let config = BufferConfig::default()
        .records_per_buffer(2)
        .partition_count(4)
        .access_mode(AccessMode::Raw);
    let bridge = ComparatorBridge::default();
    let mut edge = processor_for(EdgeKind::Broadcast, &config, &bridge, None)?;

    let mut writer = ValueWriter::new(EdgeWriter::open(&config, EdgeKind::Broadcast)?, I32Codec);
    for v in [5, -1, 42, 7, 0] {
        writer.put(&v)?;
    }
    for fragment in writer.close()?.into_fragments() {
        edge.add(fragment)?;
    }

    let inputs = edge.process()?;
    assert_eq!(inputs.len(), 4);
    for input in inputs {
        let mut reader = ValueReader::new(
            CheckedPageReader::new(FragmentQueue::new(values(input))),
            I32Codec,
        );
        let mut seen = Vec::new();
        while let Some(v) = reader.next_record()? {
            seen.push(v);
        }
        assert_eq!(seen, vec![5, -1, 42, 7, 0]);
    }
    Ok(())
}

#[test]
fn int_pages_compare_by_value() -> Result<()> {
    let mut writer = CheckedPageWriter::new(FragmentPool::new(64, 4, false))?;
    for v in [100i32, 101] {
        writer.write_i32(v)?;
        writer.end_page()?;
    }
    writer.flush(true)?;
    let batch = writer.into_sink().take_delivered().remove(0).into_input();

    let mut a = CheckedPageReader::new(FragmentQueue::new([batch.clone()]));
    let mut b = CheckedPageReader::new(FragmentQueue::new([batch]));
    assert!(a.next_page() && b.next_page());
    assert_eq!(a.compare_page(&b), Ordering::Equal);
    assert!(b.next_page());
    assert_eq!(a.compare_page(&b), Ordering::Less);
    assert_eq!(b.compare_page(&a), Ordering::Greater);

    // Only the unread part of a page takes part in the comparison.
    a.skip_bytes(3);
    assert_eq!(a.compare_page(&b), Ordering::Greater);
    a.rewind();
    assert_eq!(a.compare_page(&b), Ordering::Less);
    Ok(())
}

#[test]
fn nothing_edges_drop_their_input() -> Result<()> {
    let config = BufferConfig::default();
    let bridge = ComparatorBridge::default();
    let mut edge = processor_for(EdgeKind::None, &config, &bridge, Some("lt_int32"))?;
    let mut writer = CheckedPageWriter::new(FragmentPool::for_edge(&config, EdgeKind::None))?;
    writer.write_bool(true)?;
    writer.end_page()?;
    writer.flush(true)?;
    for fragment in writer.into_sink().take_delivered() {
        edge.add(fragment)?;
    }
    assert!(edge.process()?.is_empty());
    assert_eq!(bridge.cached(), 0);
    Ok(())
}
