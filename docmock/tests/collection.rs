use docmock::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Inner {
    f: i64,
    g: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Sample {
    #[serde(rename = "_id")]
    id: String,
    a: i64,
    b: String,
    d: Vec<i64>,
    e: Vec<Inner>,
    h: f64,
}

impl Document for Sample {
    fn id(&self) -> DocumentId {
        DocumentId::from(&self.id)
    }

    fn collection_name() -> &'static str {
        "samples"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Counter {
    #[serde(rename = "_id")]
    id: String,
    a: i64,
}

impl Document for Counter {
    fn id(&self) -> DocumentId {
        DocumentId::from(&self.id)
    }

    fn collection_name() -> &'static str {
        "counters"
    }
}

fn sample() -> Sample {
    Sample {
        id: DocumentId::generate().to_string(),
        a: 10,
        b: "good".into(),
        d: vec![1, 2, 3],
        e: vec![Inner { f: 1, g: 2.0 }, Inner { f: 5, g: 1.0 }],
        h: 1.01,
    }
}

fn counters() -> (Counter, Counter) {
    (Counter { id: "c1".into(), a: 10 }, Counter { id: "c2".into(), a: 20 })
}

async fn counter_store() -> InMemoryStore {
    let (first, second) = counters();

    InMemoryStore::builder()
        .with_documents([second, first])
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn find_one_by_id_and_by_field() {
    let data = sample();
    let store = InMemoryStore::builder()
        .with_documents([data.clone()])
        .build()
        .await
        .unwrap();
    let samples = store.typed_collection::<Sample>().await;

    assert_eq!(samples.get(data.id.as_str()).await.unwrap(), data);

    let by_field: Sample = samples.find(json!({ "h": 1.01 })).one_as().await.unwrap();
    assert_eq!(by_field, data);

    let by_elem: Sample = samples
        .find(json!({ "e": { "$elemMatch": { "f": { "$gt": 4 }, "g": { "$lte": 1.0 } } } }))
        .one_as()
        .await
        .unwrap();
    assert_eq!(by_elem, data);

    assert!(matches!(
        samples.find(json!({ "e": { "$elemMatch": { "f": { "$lte": 1 }, "g": { "$lte": 1.0 } } } })).one().await,
        Err(DocumentStoreError::DocumentNotFound(_, _))
    ));
}

#[tokio::test]
async fn find_all_and_iterate() {
    let (first, second) = counters();
    let store = counter_store().await;
    let counters = store.typed_collection::<Counter>().await;

    let tens: Vec<Counter> = counters.find(json!({ "a": 10 })).all_as().await.unwrap();
    assert_eq!(tens, vec![first.clone()]);

    let all: Vec<Counter> = counters.find(json!({ "a": { "$gte": 10 } })).all_as().await.unwrap();
    assert_eq!(all, vec![first.clone(), second.clone()]);

    let mut cursor = counters.find(Value::Null).cursor().unwrap();
    let mut iterated = Vec::new();

    while let Some(counter) = cursor.next_as::<Counter>().await.unwrap() {
        iterated.push(counter);
    }

    assert_eq!(iterated, vec![first, second]);
    assert_eq!(cursor.state(), CursorState::Exhausted);
}

#[tokio::test]
async fn counts() {
    let store = counter_store().await;
    let counters = store.collection("counters").await;

    assert_eq!(counters.find(json!({ "a": { "$gte": 10 } })).count().await.unwrap(), 2);
    assert_eq!(counters.find(json!({ "a": { "$gte": 15 } })).count().await.unwrap(), 1);
    assert_eq!(counters.find(json!({ "a": { "$gt": 20 } })).count().await.unwrap(), 0);
    assert_eq!(counters.find(json!({ "a": { "$lt": 10 } })).count().await.unwrap(), 0);
    assert_eq!(counters.find(json!({ "_id": "c1" })).count().await.unwrap(), 1);
    assert_eq!(counters.find_by_id(DocumentId::generate()).count().await.unwrap(), 0);
}

#[tokio::test]
async fn skip_and_limit() {
    let (first, second) = counters();
    let store = counter_store().await;
    let counters = store.typed_collection::<Counter>().await;
    let query = || counters.find(json!({ "a": { "$gte": 10 } }));

    let cases: Vec<(i64, i64, Vec<Counter>)> = vec![
        (1, 0, vec![second.clone()]),
        (2, 0, vec![]),
        (-1, 0, vec![first.clone(), second.clone()]),
        (0, 1, vec![first.clone()]),
        (1, 1, vec![second.clone()]),
        (0, 0, vec![first.clone(), second.clone()]),
        (0, -3, vec![first.clone(), second.clone()]),
    ];

    for (skip, limit, expected) in cases {
        let result: Vec<Counter> = query().skip(skip).limit(limit).all_as().await.unwrap();
        assert_eq!(result, expected, "skip {skip} limit {limit}");
    }
}

#[tokio::test]
async fn sorting() {
    let (first, second) = counters();
    let store = counter_store().await;
    let counters = store.typed_collection::<Counter>().await;

    let ascending: Vec<Counter> = counters.find(json!({ "a": { "$gte": 10 } })).sort(["a"]).all_as().await.unwrap();
    assert_eq!(ascending, vec![first.clone(), second.clone()]);

    let descending: Vec<Counter> = counters.find(json!({ "a": { "$gte": 10 } })).sort(["-a"]).all_as().await.unwrap();
    assert_eq!(descending, vec![second.clone(), first.clone()]);

    let skipped: Vec<Counter> = counters.find(Value::Null).sort(["-a"]).skip(1).all_as().await.unwrap();
    assert_eq!(skipped, vec![first]);

    let limited: Vec<Counter> = counters.find(Value::Null).sort(["-a"]).skip(0).limit(1).all_as().await.unwrap();
    assert_eq!(limited, vec![second]);
}

#[tokio::test]
async fn multi_key_sort_refines_ties() {
    let store = InMemoryStore::builder()
        .with_collection("rows", [
            json!({ "_id": "1", "a": 1, "b": 10, "c": "c" }),
            json!({ "_id": "2", "a": 1, "b": 6, "c": "b" }),
            json!({ "_id": "3", "a": 1, "b": 6, "c": "a" }),
            json!({ "_id": "4", "a": 2, "b": 11.1, "c": "a" }),
        ])
        .build()
        .await
        .unwrap();
    let rows = store.collection("rows").await;

    let sorted = rows.find(Value::Null).sort(["a", "b", "c"]).all().await.unwrap();
    let order = sorted
        .iter()
        .filter_map(|row| row.get("_id").and_then(Value::as_str))
        .collect::<Vec<_>>();

    assert_eq!(order, ["3", "2", "1", "4"]);
}

#[tokio::test]
async fn sort_failures_return_nothing() {
    let store = InMemoryStore::builder()
        .with_collection("shapes", [
            json!({ "_id": "1", "r": { "x": 1 } }),
            json!({ "_id": "2", "r": { "y": "a", "z": 1 } }),
        ])
        .build()
        .await
        .unwrap();
    let shapes = store.collection("shapes").await;

    assert!(matches!(
        shapes.find(Value::Null).sort(["r"]).all().await,
        Err(DocumentStoreError::TypeMismatch(_))
    ));
    assert!(matches!(
        shapes.find(Value::Null).sort(["r"]).one().await,
        Err(DocumentStoreError::TypeMismatch(_))
    ));
    assert_eq!(shapes.find(Value::Null).count().await.unwrap(), 2);
}

#[tokio::test]
async fn count_matches_all() {
    let store = InMemoryStore::builder()
        .with_collection("docs", [
            json!({ "_id": "1", "a": 10, "b": 10 }),
            json!({ "_id": "2", "a": 10, "b": 5 }),
            json!({ "_id": "3", "a": 1, "b": 5, "e": [{ "f": 1, "g": 2.0 }, { "f": 5, "g": 1.0 }] }),
        ])
        .build()
        .await
        .unwrap();
    let docs = store.collection("docs").await;

    let filters = [
        json!(null),
        json!({}),
        json!({ "a": 10 }),
        json!({ "$or": [{ "a": { "$lt": 5 } }, { "b": 10 }] }),
        json!({ "e": { "$elemMatch": { "f": { "$gt": 4 }, "g": { "$lte": 1.0 } } } }),
        json!({ "e": { "$exists": false } }),
        json!({ "b": { "$in": [5, 7] }, "a": { "$ne": 1 } }),
    ];

    for filter in filters {
        let count = docs.find(filter.clone()).count().await.unwrap();
        let all = docs.find(filter.clone()).all().await.unwrap();

        assert_eq!(count, all.len(), "filter {filter}");
    }

    assert_eq!(docs.find(json!({ "$or": [{ "a": { "$lt": 5 } }, { "b": 10 }] })).count().await.unwrap(), 2);
}

#[tokio::test]
async fn scoped_filters_select_the_right_documents() {
    let store = InMemoryStore::builder()
        .with_collection("docs", [
            json!({ "_id": "1", "f": 9, "x": 1, "e": [{ "f": 1 }], "a": { "b": 0 } }),
            json!({ "_id": "2", "f": 0, "x": 5, "e": [{ "f": 5 }], "a": { "b": 5 } }),
            json!({ "_id": "3", "b": 2, "x": 1 }),
        ])
        .build()
        .await
        .unwrap();
    let docs = store.collection("docs").await;
    let ids = |documents: Vec<Value>| {
        documents
            .iter()
            .filter_map(|document| document.get("_id").and_then(Value::as_str).map(str::to_string))
            .collect::<Vec<_>>()
    };

    let elem = docs.find(json!({ "e": { "$elemMatch": { "f": { "$gt": 4 } } } })).all().await.unwrap();
    assert_eq!(ids(elem), ["2"]);

    let nested = docs.find(json!({ "a": { "b": { "$gt": 1 } } })).all().await.unwrap();
    assert_eq!(ids(nested), ["2"]);

    let or_and = docs.find(json!({ "$or": [{ "f": 0 }, { "b": 2 }], "x": 1 })).all().await.unwrap();
    assert_eq!(ids(or_and), ["3"]);
}

#[tokio::test]
async fn writes_are_visible_to_later_queries() {
    let store = InMemoryStore::new();
    let notes = store.collection("notes").await;

    let id = notes.insert(json!({ "text": "draft", "rev": 1 }).into()).await.unwrap();
    notes.update(json!({ "text": "draft" }).into(), json!({ "text": "final", "rev": 2 }).into()).await.unwrap();

    let stored = store.collection("notes").await.find_by_id(id.clone()).one().await.unwrap();
    assert_eq!(stored.get("text"), Some(&Value::from("final")));
    assert_eq!(stored.get("_id"), Some(&Value::from(id.clone())));

    notes.remove_by_id(id).await.unwrap();
    assert_eq!(notes.find(Value::Null).count().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers() {
    let store = counter_store().await;
    let mut handles = Vec::new();

    for _ in 0..8 {
        let store = store.clone();

        handles.push(tokio::spawn(async move {
            store
                .collection("counters")
                .await
                .find(json!({ "a": { "$gte": 10 } }))
                .sort(["-a"])
                .all()
                .await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].get("a"), Some(&Value::from(20)));
    }
}
