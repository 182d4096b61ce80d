mod common;

use anyhow::Result;
use serde_json::json;

#[tokio::test]
async fn disciplines_require_unique_course_code() -> Result<()> {
    let server = common::open_server().await?;
    let client = &server.client;

    let res = client
        .post(server.url("/disciplines"))
        .json(&json!({"groups": ["BIV201"], "emails": []}))
        .send()
        .await?;
    let (status, _) = common::envelope(res).await?;
    assert_eq!(status, 400);

    let discipline = json!({
        "course_code": "CS101",
        "groups": ["BIV201", "BIV202"],
        "emails": ["lecturer@example.com"]
    });
    let res = client.post(server.url("/disciplines")).json(&discipline).send().await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, 201);
    let id = body["data"]["_id"].as_str().unwrap().to_string();

    let res = client.post(server.url("/disciplines")).json(&discipline).send().await?;
    let (status, _) = common::envelope(res).await?;
    assert_eq!(status, 403);

    let res = client
        .patch(server.url(&format!("/disciplines/{}", id)))
        .json(&json!({"groups": ["BIV203"]}))
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["groups"], json!(["BIV203"]));
    assert_eq!(body["data"]["course_code"], json!("CS101"));
    Ok(())
}

#[tokio::test]
async fn lessons_and_records_allow_repeats() -> Result<()> {
    let server = common::open_server().await?;
    let client = &server.client;

    let lesson = json!({"course_code": "CS101", "room_name": "504", "date": "2020-10-27"});
    for _ in 0..2 {
        let res = client.post(server.url("/lessons")).json(&lesson).send().await?;
        let (status, _) = common::envelope(res).await?;
        assert_eq!(status, 201);
    }

    let res = client
        .post(server.url("/records"))
        .json(&json!({"room_name": "504", "drive_file_url": "https://drive/file"}))
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, 201);
    let id = body["data"]["_id"].as_str().unwrap().to_string();

    let res = client
        .put(server.url(&format!("/records/{}", id)))
        .json(&json!({"room_name": "505"}))
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, 200);
    assert_eq!(body["data"], json!({"_id": id, "room_name": "505"}));

    let res = client.get(server.url("/lessons")).send().await?;
    let (_, body) = common::envelope(res).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    Ok(())
}
