// SampleRepo tests: init, insert, listing, counts, window queries

mod common;

use common::{new_sample, test_repo, ts};
use ttfbmon::models::Category;
use ttfbmon::sample_repo::ListFilter;

#[tokio::test]
async fn connect_and_init_is_idempotent() {
    let (_dir, repo) = test_repo().await;
    // Second init is a no-op (IF NOT EXISTS)
    repo.init().await.unwrap();
}

#[tokio::test]
async fn insert_assigns_monotonic_ids() {
    let (_dir, repo) = test_repo().await;
    let first = repo.insert(&new_sample(900, "/a", ts(1000))).await.unwrap();
    let second = repo.insert(&new_sample(900, "/b", ts(2000))).await.unwrap();
    assert!(second > first);
}

#[tokio::test]
async fn list_is_newest_recorded_first() {
    let (_dir, repo) = test_repo().await;
    repo.insert(&new_sample(900, "/old", ts(1000))).await.unwrap();
    repo.insert(&new_sample(900, "/new", ts(3000))).await.unwrap();
    repo.insert(&new_sample(900, "/mid", ts(2000))).await.unwrap();

    let filter = ListFilter {
        page: 1,
        per_page: 10,
        ..Default::default()
    };
    let listed = repo.list(&filter).await.unwrap();
    let urls: Vec<&str> = listed.iter().map(|s| s.url.as_str()).collect();
    assert_eq!(urls, vec!["/new", "/mid", "/old"]);
}

#[tokio::test]
async fn list_paging() {
    let (_dir, repo) = test_repo().await;
    for i in 0..5 {
        repo.insert(&new_sample(900, &format!("/p{i}"), ts(1000 + i)))
            .await
            .unwrap();
    }
    let page2 = repo
        .list(&ListFilter {
            page: 2,
            per_page: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page2.len(), 2);
    assert_eq!(page2[0].url, "/p2");
    assert_eq!(page2[1].url, "/p1");
}

#[tokio::test]
async fn category_filter_and_count() {
    let (_dir, repo) = test_repo().await;
    repo.insert(&new_sample(900, "/w", ts(1000))).await.unwrap();
    repo.insert(&new_sample(2000, "/b", ts(2000))).await.unwrap();
    repo.insert(&new_sample(2500, "/b2", ts(3000))).await.unwrap();

    let bad_only = ListFilter {
        category: Some(Category::Bad),
        page: 1,
        per_page: 10,
        ..Default::default()
    };
    assert_eq!(repo.count(&bad_only).await.unwrap(), 2);
    let listed = repo.list(&bad_only).await.unwrap();
    assert!(listed.iter().all(|s| s.category == Category::Bad));
}

#[tokio::test]
async fn search_matches_url_substring_with_like_escaping() {
    let (_dir, repo) = test_repo().await;
    repo.insert(&new_sample(900, "/sale%20page", ts(1000))).await.unwrap();
    repo.insert(&new_sample(900, "/sale-page", ts(2000))).await.unwrap();

    let filter = ListFilter {
        search: Some("%20".into()),
        page: 1,
        per_page: 10,
        ..Default::default()
    };
    let listed = repo.list(&filter).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].url, "/sale%20page");
    assert_eq!(repo.count(&filter).await.unwrap(), 1);
}

#[tokio::test]
async fn summary_counts_are_inclusive_of_both_bounds() {
    let (_dir, repo) = test_repo().await;
    repo.insert(&new_sample(900, "/at-start", ts(1000))).await.unwrap();
    repo.insert(&new_sample(2000, "/inside", ts(1500))).await.unwrap();
    repo.insert(&new_sample(900, "/at-end", ts(2000))).await.unwrap();
    repo.insert(&new_sample(900, "/outside", ts(2001))).await.unwrap();

    let counts = repo.summary_counts(ts(1000), ts(2000)).await.unwrap();
    assert_eq!(counts.warning, 2);
    assert_eq!(counts.bad, 1);
}

#[tokio::test]
async fn empty_window_counts_are_zero() {
    let (_dir, repo) = test_repo().await;
    let counts = repo.summary_counts(ts(0), ts(100)).await.unwrap();
    assert_eq!(counts.warning, 0);
    assert_eq!(counts.bad, 0);
}

#[tokio::test]
async fn top_slowest_is_bad_only_descending_with_stable_ties() {
    let (_dir, repo) = test_repo().await;
    repo.insert(&new_sample(1700, "/warning", ts(1000))).await.unwrap();
    repo.insert(&new_sample(2000, "/first-2000", ts(1001))).await.unwrap();
    repo.insert(&new_sample(3000, "/slowest", ts(1002))).await.unwrap();
    repo.insert(&new_sample(2000, "/second-2000", ts(1003))).await.unwrap();

    let top = repo.top_slowest(ts(0), ts(5000), 50).await.unwrap();
    let urls: Vec<&str> = top.iter().map(|s| s.url.as_str()).collect();
    assert_eq!(urls, vec!["/slowest", "/first-2000", "/second-2000"]);

    let limited = repo.top_slowest(ts(0), ts(5000), 2).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn list_fields_survive_storage() {
    let (_dir, repo) = test_repo().await;
    let mut sample = new_sample(2000, "/x", ts(1000));
    sample.query_params = vec!["a".into(), "b".into()];
    sample.cookies = vec!["session".into()];
    repo.insert(&sample).await.unwrap();

    let listed = repo
        .list(&ListFilter {
            page: 1,
            per_page: 1,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(listed[0].query_params, vec!["a", "b"]);
    assert_eq!(listed[0].cookies, vec!["session"]);
}
