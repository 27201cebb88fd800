use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::Filter;

use patientdb::api::RestApi;
use patientdb::config::StorageConfig;
use patientdb::records::RecordService;
use patientdb::storage::PatientStore;

fn create_test_api(
    dir: &tempfile::TempDir,
) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
    let config = StorageConfig {
        path: dir.path().join("patients.json"),
    };
    let store = Arc::new(PatientStore::new(&config).unwrap());
    RestApi::new(Arc::new(RecordService::new(store))).routes()
}

fn patient(id: &str, height: f64, weight: f64) -> Value {
    json!({
        "id": id,
        "name": "Ravi Mehta",
        "city": "Mumbai",
        "age": 35,
        "gender": "male",
        "height": height,
        "weight": weight
    })
}

fn body(resp: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
    serde_json::from_slice(resp.body()).unwrap()
}

#[tokio::test]
async fn test_home_and_about() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    let resp = warp::test::request().path("/").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp)["message"], "Patient Management System API.");

    let resp = warp::test::request().path("/about").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_then_view() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    let resp = warp::test::request()
        .method("POST")
        .path("/create")
        .json(&patient("P001", 1.75, 70.0))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body(&resp)["status"], "success");

    let resp = warp::test::request().path("/view/P001").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body(&resp),
        json!({
            "id": "P001",
            "name": "Ravi Mehta",
            "city": "Mumbai",
            "age": 35,
            "gender": "male",
            "height": 1.75,
            "weight": 70.0,
            "bmi": 22.86,
            "verdict": "Normal"
        })
    );

    let resp = warp::test::request().path("/view").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp)["P001"]["bmi"], 22.86);
}

#[tokio::test]
async fn test_create_duplicate_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    let create = |p: Value| {
        warp::test::request()
            .method("POST")
            .path("/create")
            .json(&p)
    };

    let resp = create(patient("P001", 1.75, 70.0)).reply(&api).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = create(patient("P001", 1.60, 50.0)).reply(&api).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = warp::test::request().path("/view/P001").reply(&api).await;
    assert_eq!(body(&resp)["height"], 1.75);
}

#[tokio::test]
async fn test_create_invalid_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    let mut invalid = patient("P001", 1.75, 70.0);
    invalid["age"] = json!(150);
    let resp = warp::test::request()
        .method("POST")
        .path("/create")
        .json(&invalid)
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body(&resp)["data"][0]["field"], "age");

    let mut bad_gender = patient("P002", 1.75, 70.0);
    bad_gender["gender"] = json!("unknown");
    let resp = warp::test::request()
        .method("POST")
        .path("/create")
        .json(&bad_gender)
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body(&resp)["data"][0]["field"], "gender");

    let tiny = patient("P003", 1e-200, 70.0);
    let resp = warp::test::request()
        .method("POST")
        .path("/create")
        .json(&tiny)
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body(&resp)["data"][0]["field"], "height");

    let resp = warp::test::request().path("/view").reply(&api).await;
    assert_eq!(body(&resp), json!({}));
}

#[tokio::test]
async fn test_edit_recomputes_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    warp::test::request()
        .method("POST")
        .path("/create")
        .json(&patient("P001", 1.75, 70.0))
        .reply(&api)
        .await;

    let resp = warp::test::request()
        .method("PUT")
        .path("/edit/P001")
        .json(&json!({"weight": 90, "id": "P999"}))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = warp::test::request().path("/view/P001").reply(&api).await;
    let view = body(&resp);
    assert_eq!(view["bmi"], 29.39);
    assert_eq!(view["verdict"], "Overweight");

    let resp = warp::test::request().path("/view/P999").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_errors() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    let resp = warp::test::request()
        .method("PUT")
        .path("/edit/P404")
        .json(&json!({"age": 30}))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    warp::test::request()
        .method("POST")
        .path("/create")
        .json(&patient("P001", 1.75, 70.0))
        .reply(&api)
        .await;

    let resp = warp::test::request()
        .method("PUT")
        .path("/edit/P001")
        .json(&json!({"height": -1.0}))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = warp::test::request().path("/view/P001").reply(&api).await;
    assert_eq!(body(&resp)["height"], 1.75);
}

#[tokio::test]
async fn test_delete() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    warp::test::request()
        .method("POST")
        .path("/create")
        .json(&patient("P001", 1.75, 70.0))
        .reply(&api)
        .await;

    let resp = warp::test::request()
        .method("DELETE")
        .path("/delete/P001")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = warp::test::request().path("/view/P001").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = warp::test::request()
        .method("DELETE")
        .path("/delete/P001")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sort() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    for (id, weight) in [("P001", 18.0), ("P002", 30.5), ("P003", 24.0)] {
        warp::test::request()
            .method("POST")
            .path("/create")
            .json(&patient(id, 1.0, weight))
            .reply(&api)
            .await;
    }

    let resp = warp::test::request()
        .path("/sort?sort_by=bmi")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bmis: Vec<f64> = body(&resp)
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["bmi"].as_f64().unwrap())
        .collect();
    assert_eq!(bmis, vec![18.0, 24.0, 30.5]);

    let resp = warp::test::request()
        .path("/sort?sort_by=weight&order=desc")
        .reply(&api)
        .await;
    let ids: Vec<String> = body(&resp)
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["P002", "P003", "P001"]);
}

#[tokio::test]
async fn test_sort_invalid_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    for path in [
        "/sort?sort_by=invalid_field",
        "/sort?sort_by=bmi&order=sideways",
    ] {
        let resp = warp::test::request().path(path).reply(&api).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(body(&resp)["status"], "error");
    }

    let resp = warp::test::request().path("/sort?order=asc").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body(&resp)["data"][0]["field"], "sort_by");
}

#[tokio::test]
async fn test_encoded_ids_are_reachable() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    let resp = warp::test::request()
        .method("POST")
        .path("/create")
        .json(&patient("P 001", 1.75, 70.0))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = warp::test::request().path("/view/P%20001").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp)["id"], "P 001");

    let resp = warp::test::request()
        .method("PUT")
        .path("/edit/P%20001")
        .json(&json!({"age": 36.0}))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp)["data"]["age"], 36);

    let resp = warp::test::request()
        .method("DELETE")
        .path("/delete/P%20001")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = warp::test::request().path("/view/P%20001").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = warp::test::request().path("/view/%FF").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_edits_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    for i in 0..8 {
        warp::test::request()
            .method("POST")
            .path("/create")
            .json(&patient(&format!("P{:03}", i), 1.75, 70.0))
            .reply(&api)
            .await;
    }

    let edits: Vec<_> = (0..8)
        .map(|i| {
            let api = api.clone();
            tokio::spawn(async move {
                warp::test::request()
                    .method("PUT")
                    .path(&format!("/edit/P{:03}", i))
                    .json(&json!({"weight": 80 + i}))
                    .reply(&api)
                    .await
                    .status()
            })
        })
        .collect();

    let resp = warp::test::request().path("/").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::OK);

    for edit in edits {
        assert_eq!(edit.await.unwrap(), StatusCode::OK);
    }

    let resp = warp::test::request().path("/view").reply(&api).await;
    let all = body(&resp);
    for i in 0..8 {
        assert_eq!(all[format!("P{:03}", i)]["weight"], (80 + i) as f64);
    }
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = tempfile::tempdir().unwrap();
    let api = create_test_api(&dir);

    let resp = warp::test::request().path("/nowhere").reply(&api).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&resp)["status"], "error");
}
