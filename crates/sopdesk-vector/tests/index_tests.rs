use sopdesk_core::types::DistanceMetric;
use sopdesk_vector::VectorIndex;

fn corpus() -> Vec<(Vec<f32>, String)> {
    vec![
        (vec![1.0, 0.0, 0.0], "returns".to_string()),
        (vec![0.0, 1.0, 0.0], "refunds".to_string()),
        (vec![0.0, 0.0, 1.0], "shipping".to_string()),
        (vec![0.7, 0.7, 0.0], "exchanges".to_string()),
    ]
}

#[test]
fn querying_a_stored_vector_returns_its_text_at_distance_zero() {
    for metric in [DistanceMetric::L2, DistanceMetric::Cosine] {
        let index = VectorIndex::build(metric, corpus()).unwrap();
        for (vector, text) in corpus() {
            let hits = index.query(&vector, 1).unwrap();
            assert_eq!(hits[0].text, text);
            assert!(hits[0].distance.abs() < 1e-6, "{metric:?}: {}", hits[0].distance);
        }
    }
}

#[test]
fn results_are_bounded_by_k_and_corpus_size_and_sorted() {
    let index = VectorIndex::build(DistanceMetric::L2, corpus()).unwrap();
    let query = [0.5, 0.4, 0.1];
    for k in [0, 1, 3, 4, 10] {
        let hits = index.query(&query, k).unwrap();
        assert_eq!(hits.len(), k.min(index.len()));
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }
}

#[test]
fn equal_distances_keep_insertion_order() {
    let items = vec![
        (vec![1.0, 0.0], "first".to_string()),
        (vec![0.0, 1.0], "second".to_string()),
        (vec![-1.0, 0.0], "third".to_string()),
        (vec![0.0, -1.0], "fourth".to_string()),
    ];
    let index = VectorIndex::build(DistanceMetric::L2, items).unwrap();
    let hits = index.query(&[0.0, 0.0], 4).unwrap();
    let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second", "third", "fourth"]);
    assert_eq!(hits.iter().map(|h| h.ordinal).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
}

#[test]
fn empty_index_returns_nothing_for_any_query() {
    let index = VectorIndex::build(DistanceMetric::Cosine, Vec::new()).unwrap();
    assert!(index.is_empty());
    assert!(index.query(&[1.0, 2.0], 5).unwrap().is_empty());
    assert!(index.query(&[], 5).unwrap().is_empty());
}

#[test]
fn mixed_dimensions_are_rejected() {
    let items = vec![(vec![1.0, 0.0], "a".to_string()), (vec![1.0], "b".to_string())];
    assert!(VectorIndex::build(DistanceMetric::L2, items).is_err());

    let index = VectorIndex::build(DistanceMetric::L2, corpus()).unwrap();
    assert!(index.query(&[1.0, 0.0], 1).is_err());
}
