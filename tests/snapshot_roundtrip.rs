use timehist::snapshot::{read_snapshot, write_snapshot};
use timehist::{aggregate_at, parse_timestamp, HistogramStore, Result, WindowConfig};

#[test]
fn roundtrip_store() -> Result<()> {
    let store = make_store(5_000);

    let bytes = store.serialize()?;
    let restored = HistogramStore::deserialize(&bytes)?;

    assert_eq!(restored, store);
    assert_eq!(restored.len(), store.len());
    assert_eq!(restored.total(), store.total());
    for (minute, count) in &store {
        assert_eq!(restored.count_at(minute), count);
    }
    Ok(())
}

#[test]
fn roundtrip_file_gives_identical_statistics() -> Result<()> {
    let store = make_store(2_000);
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("histogram.thst");

    write_snapshot(&path, &store)?;
    let restored = read_snapshot(&path)?;

    let reference = parse_timestamp("2016-03-10T12:34:00")?;
    let config = WindowConfig::new(15, 10)?;
    assert_eq!(
        aggregate_at(&restored, reference, &config)?,
        aggregate_at(&store, reference, &config)?
    );
    Ok(())
}

#[test]
fn restored_store_keeps_growing() -> Result<()> {
    let mut restored = HistogramStore::deserialize(&make_store(10).serialize()?)?;
    let before = restored.total();
    restored.insert("2001-01-01T00:00:00")?;
    assert_eq!(restored.total(), before + 1);
    Ok(())
}

fn make_store(events: usize) -> HistogramStore {
    let mut rng = Lcg::new(0x9E37_79B9_7F4A_7C15);
    let mut store = HistogramStore::new();
    // 2015-01-01T00:00:00Z through roughly three years later
    let start = 1_420_070_400i64;
    for _ in 0..events {
        let secs = start + (rng.next_u64() % (3 * 365 * 86_400)) as i64;
        let instant = chrono::DateTime::from_timestamp(secs, 0)
            .unwrap()
            .naive_utc();
        store.record(instant);
    }
    store
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }
}
