//! End-to-end scenarios A-F and the numbered invariants from spec §7/§8,
//! driven entirely through the public `Operator` API.

use std::collections::BTreeMap;
use std::time::Duration;

use pretty_assertions::assert_eq;

use tower_kv::codec::primitive::PrimitiveData;
use tower_kv::{Config, DataFrame, Error, Operator};

fn fast_ttl_operator() -> Operator {
    let _ = env_logger::try_init();
    let _ = tracing_subscriber::fmt::try_init();
    let mut config = Config::in_memory();
    config.ttl_precision = Duration::from_millis(50);
    Operator::new(config).unwrap()
}

#[tokio::test]
async fn scenario_a_int_arithmetic() {
    let op = Operator::new(Config::in_memory()).unwrap();
    op.set_int("x", 10).unwrap();
    assert_eq!(op.add_int("x", 5).unwrap(), 15);
    assert_eq!(op.mul_int("x", 3).unwrap(), 45);
    assert_eq!(op.mod_int("x", 7).unwrap(), 3);
    assert!(matches!(op.div_int("x", 0), Err(Error::DivByZero(_))));
}

#[tokio::test]
async fn scenario_b_list_push_pop_range() {
    let op = Operator::new(Config::in_memory()).unwrap();
    op.list_create("L").unwrap();
    op.list_push_left("L", PrimitiveData::String("a".into())).unwrap();
    op.list_push_left("L", PrimitiveData::String("b".into())).unwrap();
    op.list_push_right("L", PrimitiveData::String("c".into())).unwrap();

    assert_eq!(op.list_length("L").unwrap(), 3);
    assert_eq!(op.list_get("L", 0).unwrap(), PrimitiveData::String("b".into()));
    assert_eq!(op.list_get("L", -1).unwrap(), PrimitiveData::String("c".into()));
    assert_eq!(
        op.list_range("L", 0, -1).unwrap(),
        vec![
            PrimitiveData::String("b".into()),
            PrimitiveData::String("a".into()),
            PrimitiveData::String("c".into()),
        ]
    );
    assert_eq!(op.list_pop_left("L").unwrap(), PrimitiveData::String("b".into()));
    assert_eq!(op.list_length("L").unwrap(), 2);
}

#[tokio::test]
async fn scenario_c_set_membership() {
    let op = Operator::new(Config::in_memory()).unwrap();
    op.set_create("S").unwrap();
    op.set_add("S", "apple").unwrap();
    op.set_add("S", "apple").unwrap();
    op.set_add("S", "banana").unwrap();

    assert_eq!(op.set_cardinality("S").unwrap(), 2);
    assert!(op.set_contains("S", "apple").unwrap());
    assert!(!op.set_contains("S", "cherry").unwrap());

    let mut members = op.set_members("S").unwrap();
    members.sort();
    assert_eq!(members, vec!["apple".to_string(), "banana".to_string()]);
}

#[tokio::test]
async fn scenario_d_timeseries_range() {
    let op = Operator::new(Config::in_memory()).unwrap();
    op.ts_create("T").unwrap();
    let t0: u64 = 10_000_000_000;
    let thirty_min = 30 * 60 * 1_000_000_000u64;
    let one_hour = 60 * 60 * 1_000_000_000u64;
    let two_hours = 2 * one_hour;

    op.ts_add_point("T", t0, PrimitiveData::Int(10)).unwrap();
    op.ts_add_point("T", t0 + thirty_min, PrimitiveData::Int(20)).unwrap();
    op.ts_add_point("T", t0 + one_hour, PrimitiveData::Int(30)).unwrap();
    op.ts_add_point("T", t0 + two_hours, PrimitiveData::Int(40)).unwrap();

    let five_min = 5 * 60 * 1_000_000_000u64;
    let points = op.ts_range("T", t0 - five_min, t0 + one_hour + five_min).unwrap();

    let expected: BTreeMap<u64, PrimitiveData> = [
        (t0, PrimitiveData::Int(10)),
        (t0 + thirty_min, PrimitiveData::Int(20)),
        (t0 + one_hour, PrimitiveData::Int(30)),
    ]
    .into_iter()
    .collect();
    assert_eq!(points, expected);
}

#[tokio::test]
async fn scenario_e_ttl_reaping() {
    let op = fast_ttl_operator();
    op.set_string("k", "v").unwrap();
    let now = op.now_millis();
    op.set_ttl("k", now + 10).unwrap();
    // background reaper ticks every 50ms (see `fast_ttl_operator`); give it
    // a few ticks to pick up the bucket and revalidate+delete the key.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(matches!(op.get_string("k"), Err(Error::NotFound(_))));
}

#[test]
fn scenario_f_codec_wire_format() {
    let frame = DataFrame::int(42);
    let (decoded, _) = DataFrame::decode(&frame.encode_to_vec()).unwrap();
    assert_eq!(decoded.as_int().unwrap(), 42);

    let meta = DataFrame::list_meta("L", -1, 0, 2);
    let bytes = meta.encode_to_vec();
    let payload = &bytes[9..];
    assert_eq!(&payload[0..8], &(-1i64).to_be_bytes());
    assert_eq!(&payload[8..16], &0i64.to_be_bytes());
    assert_eq!(&payload[16..24], &2i64.to_be_bytes());
    assert_eq!(&payload[24..], b"L");
}

// ---- numbered invariants (spec §8) -----------------------------------------

#[tokio::test]
async fn invariant_1_scalar_round_trip() {
    let op = Operator::new(Config::in_memory()).unwrap();
    op.set_int("k", 7).unwrap();
    assert_eq!(op.get_int("k").unwrap(), 7);
}

#[tokio::test]
async fn invariant_3_type_stickiness() {
    let op = Operator::new(Config::in_memory()).unwrap();
    op.set_int("k", 7).unwrap();
    assert!(matches!(op.get_string("k"), Err(Error::TypeMismatch(_))));
}

#[tokio::test]
async fn invariant_4_list_length_law() {
    let op = Operator::new(Config::in_memory()).unwrap();
    op.list_create("L").unwrap();
    op.list_push_right("L", PrimitiveData::Int(1)).unwrap();
    op.list_push_right("L", PrimitiveData::Int(2)).unwrap();
    assert_eq!(op.list_length("L").unwrap(), 2);
    op.list_pop_left("L").unwrap();
    op.list_pop_left("L").unwrap();
    assert_eq!(op.list_length("L").unwrap(), 0);
}

#[tokio::test]
async fn invariant_5_push_pop_symmetry() {
    let op = Operator::new(Config::in_memory()).unwrap();
    op.list_create("L").unwrap();
    let before = op.list_length("L").unwrap();
    op.list_push_left("L", PrimitiveData::Int(9)).unwrap();
    assert_eq!(op.list_pop_left("L").unwrap(), PrimitiveData::Int(9));
    assert_eq!(op.list_length("L").unwrap(), before);

    op.list_push_right("L", PrimitiveData::Int(3)).unwrap();
    assert_eq!(op.list_pop_right("L").unwrap(), PrimitiveData::Int(3));
    assert_eq!(op.list_length("L").unwrap(), before);
}

#[tokio::test]
async fn invariant_6_set_dedup() {
    let op = Operator::new(Config::in_memory()).unwrap();
    op.set_create("S").unwrap();
    op.set_add("S", "m").unwrap();
    op.set_add("S", "m").unwrap();
    assert_eq!(op.set_cardinality("S").unwrap(), 1);
}

#[tokio::test]
async fn invariant_7_map_count() {
    let op = Operator::new(Config::in_memory()).unwrap();
    op.map_create("M").unwrap();
    op.map_set_key("M", "a", PrimitiveData::Int(1)).unwrap();
    op.map_set_key("M", "a", PrimitiveData::Int(2)).unwrap();
    op.map_set_key("M", "b", PrimitiveData::Int(3)).unwrap();
    assert_eq!(op.map_length("M").unwrap(), 2);
    op.map_delete_key("M", "a").unwrap();
    assert_eq!(op.map_length("M").unwrap(), 1);
}

#[tokio::test]
async fn invariant_11_reaper_non_destruction() {
    let op = fast_ttl_operator();
    op.set_string("k", "v").unwrap();
    let now = op.now_millis();
    op.set_ttl("k", now + 10).unwrap();
    op.remove_ttl("k").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(op.get_string("k").unwrap(), "v");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn invariant_12_concurrency_across_keys_does_not_deadlock() {
    use std::sync::Arc;

    let op = Arc::new(Operator::new(Config::in_memory()).unwrap());
    let mut handles = Vec::new();
    for i in 0..8 {
        let op = op.clone();
        handles.push(tokio::spawn(async move {
            let key = format!("k{i}");
            op.set_int(&key, 0).unwrap();
            for _ in 0..100 {
                op.add_int(&key, 1).unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    for i in 0..8 {
        assert_eq!(op.get_int(&format!("k{i}")).unwrap(), 100);
    }
}
