use ripple_backend::api;
use ripple_backend::config::{RippleConfig, RipplePaths};
use ripple_backend::database::Database;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tokio::time::{sleep, Duration};

struct TestServer {
    _dir: TempDir,
    server: tokio::task::JoinHandle<()>,
    base_url: String,
}

impl TestServer {
    async fn shutdown(self) {
        self.server.abort();
        let _ = self.server.await;
    }
}

fn next_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .unwrap()
        .port()
}

async fn wait_for_health(base_url: &str) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("server did not become healthy in time");
}

async fn spawn_server() -> TestServer {
    let dir = tempdir().expect("tempdir");
    let port = next_port();
    let paths = RipplePaths::from_base_dir(dir.path()).expect("paths");
    paths.ensure_dirs().expect("dirs");
    let config = RippleConfig::new(port, paths.clone());
    let database = Database::connect(&paths).expect("connect");
    database.ensure_migrations().expect("migrations");

    let server_config = config.clone();
    let server_database = database.clone();
    let server = tokio::spawn(async move {
        let _ = api::serve_http(server_config, server_database).await;
    });

    let base_url = format!("http://127.0.0.1:{port}");
    wait_for_health(&base_url).await;

    TestServer {
        _dir: dir,
        server,
        base_url,
    }
}

async fn register(client: &reqwest::Client, base_url: &str, name: &str, email: &str) -> String {
    let resp = client
        .post(format!("{base_url}/register"))
        .json(&json!({
            "name": name,
            "email": email,
            "password": "password123",
        }))
        .send()
        .await
        .expect("register response");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("register json");
    assert_eq!(body["success"], true);
    body["data"]["token"].as_str().expect("token").to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn content_roundtrip_with_likes_comments_and_tags() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let author = register(&client, base, "Author", "author@example.com").await;
    let reader = register(&client, base, "Reader", "reader@example.com").await;

    // Author publishes a post.
    let post: Value = client
        .post(format!("{base}/posts"))
        .bearer_auth(&author)
        .json(&json!({
            "title": "Hello World!",
            "content": "<p>First post content</p>",
            "status": "published",
        }))
        .send()
        .await
        .expect("create post")
        .json()
        .await
        .expect("post json");
    assert_eq!(post["success"], true);
    let slug = post["data"]["post"]["slug"].as_str().expect("slug");
    assert_eq!(slug, "hello-world");
    assert_eq!(post["data"]["post"]["excerpt"], "First post content");

    // Reader sees it in the public listing.
    let listing: Value = client
        .get(format!("{base}/posts"))
        .send()
        .await
        .expect("list posts")
        .json()
        .await
        .expect("listing json");
    assert_eq!(listing["data"]["posts"].as_array().unwrap().len(), 1);
    assert_eq!(listing["data"]["pagination"]["total"], 1);

    // Reader likes the post; the toggle reports the live count.
    let liked: Value = client
        .post(format!("{base}/posts/{slug}/like"))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("like")
        .json()
        .await
        .expect("like json");
    assert_eq!(liked["data"]["liked"], true);
    assert_eq!(liked["data"]["likes_count"], 1);

    // Comment plus nested reply.
    let comment: Value = client
        .post(format!("{base}/posts/{slug}/comments"))
        .bearer_auth(&reader)
        .json(&json!({"body": "Great read"}))
        .send()
        .await
        .expect("comment")
        .json()
        .await
        .expect("comment json");
    let comment_id = comment["data"]["comment"]["id"].as_i64().expect("comment id");

    let reply_resp = client
        .post(format!("{base}/comments/{comment_id}/replies"))
        .bearer_auth(&author)
        .json(&json!({"body": "Thanks!"}))
        .send()
        .await
        .expect("reply");
    assert_eq!(reply_resp.status(), 201);

    let comments: Value = client
        .get(format!("{base}/posts/{slug}/comments"))
        .send()
        .await
        .expect("list comments")
        .json()
        .await
        .expect("comments json");
    let top_level = comments["data"]["comments"].as_array().unwrap();
    assert_eq!(top_level.len(), 1);
    assert_eq!(top_level[0]["replies_count"], 1);
    assert_eq!(top_level[0]["replies"][0]["body"], "Thanks!");

    // Tag the post and check trending.
    let tag_resp = client
        .post(format!("{base}/tags"))
        .bearer_auth(&author)
        .json(&json!({"name": "Rust"}))
        .send()
        .await
        .expect("create tag");
    assert_eq!(tag_resp.status(), 201);

    let attached: Value = client
        .post(format!("{base}/tags/rust/attach"))
        .bearer_auth(&author)
        .json(&json!({"post_id": post["data"]["post"]["id"]}))
        .send()
        .await
        .expect("attach")
        .json()
        .await
        .expect("attach json");
    assert_eq!(attached["data"]["tags"].as_array().unwrap().len(), 1);

    let trending: Value = client
        .get(format!("{base}/feed/trending-tags"))
        .send()
        .await
        .expect("trending")
        .json()
        .await
        .expect("trending json");
    assert_eq!(trending["data"]["tags"][0]["slug"], "rust");
    assert_eq!(trending["data"]["tags"][0]["posts_count"], 1);

    // Detail view carries counts, tags, and comments.
    let detail: Value = client
        .get(format!("{base}/posts/{slug}"))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("detail")
        .json()
        .await
        .expect("detail json");
    assert_eq!(detail["data"]["post"]["likes_count"], 1);
    assert_eq!(detail["data"]["post"]["comments_count"], 2);
    assert_eq!(detail["data"]["post"]["is_liked"], true);
    assert_eq!(detail["data"]["post"]["tags"][0]["slug"], "rust");
    assert_eq!(detail["data"]["post"]["comments"].as_array().unwrap().len(), 1);

    // Popular feed includes the liked post.
    let popular: Value = client
        .get(format!("{base}/feed/popular"))
        .send()
        .await
        .expect("popular")
        .json()
        .await
        .expect("popular json");
    assert_eq!(popular["data"]["posts"][0]["slug"], "hello-world");

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_like_requests_never_double_count() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let author = register(&client, base, "Author", "author@example.com").await;
    let post: Value = client
        .post(format!("{base}/posts"))
        .bearer_auth(&author)
        .json(&json!({"title": "Raced", "content": "body", "status": "published"}))
        .send()
        .await
        .expect("create post")
        .json()
        .await
        .expect("post json");
    let slug = post["data"]["post"]["slug"].as_str().expect("slug");

    // Two toggles from the same user land at the same time; the pair
    // uniqueness constraint means no interleaving can yield two rows.
    let first = client
        .post(format!("{base}/posts/{slug}/like"))
        .bearer_auth(&author)
        .send();
    let second = client
        .post(format!("{base}/posts/{slug}/like"))
        .bearer_auth(&author)
        .send();
    let (first, second) = tokio::join!(first, second);

    for resp in [first.expect("first toggle"), second.expect("second toggle")] {
        assert!(resp.status().is_success());
        let body: Value = resp.json().await.expect("toggle json");
        assert!(body["data"]["likes_count"].as_i64().expect("count") <= 1);
    }

    let detail: Value = client
        .get(format!("{base}/posts/{slug}"))
        .bearer_auth(&author)
        .send()
        .await
        .expect("detail")
        .json()
        .await
        .expect("detail json");
    let likes = detail["data"]["post"]["likes_count"].as_i64().expect("count");
    assert!(likes <= 1);
    assert_eq!(
        detail["data"]["post"]["is_liked"].as_bool().expect("is_liked"),
        likes == 1
    );

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn auth_ownership_and_validation_rules() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    // Mutations without a token are rejected.
    let resp = client
        .post(format!("{base}/posts"))
        .json(&json!({"title": "Nope", "content": "x"}))
        .send()
        .await
        .expect("anon create");
    assert_eq!(resp.status(), 401);

    // Validation failures carry a field->messages map.
    let resp = client
        .post(format!("{base}/register"))
        .json(&json!({"name": "", "email": "bad", "password": "123"}))
        .send()
        .await
        .expect("invalid register");
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.expect("error json");
    assert_eq!(body["success"], false);
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());

    let owner = register(&client, base, "Owner", "owner@example.com").await;
    let intruder = register(&client, base, "Intruder", "intruder@example.com").await;

    // Bad credentials surface as a 422 on the email field.
    let resp = client
        .post(format!("{base}/login"))
        .json(&json!({"email": "owner@example.com", "password": "wrongpassword"}))
        .send()
        .await
        .expect("bad login");
    assert_eq!(resp.status(), 422);

    let post: Value = client
        .post(format!("{base}/posts"))
        .bearer_auth(&owner)
        .json(&json!({"title": "Mine", "content": "body", "status": "published"}))
        .send()
        .await
        .expect("create")
        .json()
        .await
        .expect("post json");
    let slug = post["data"]["post"]["slug"].as_str().unwrap();

    // Another authenticated user cannot modify it.
    let resp = client
        .put(format!("{base}/posts/{slug}"))
        .bearer_auth(&intruder)
        .json(&json!({"title": "Stolen"}))
        .send()
        .await
        .expect("foreign update");
    assert_eq!(resp.status(), 403);

    let resp = client
        .delete(format!("{base}/posts/{slug}"))
        .bearer_auth(&intruder)
        .send()
        .await
        .expect("foreign delete");
    assert_eq!(resp.status(), 403);

    // Missing resources are 404s.
    let resp = client
        .get(format!("{base}/posts/does-not-exist"))
        .send()
        .await
        .expect("missing post");
    assert_eq!(resp.status(), 404);

    // Logout invalidates the token.
    let resp = client
        .post(format!("{base}/logout"))
        .bearer_auth(&owner)
        .send()
        .await
        .expect("logout");
    assert!(resp.status().is_success());
    let resp = client
        .get(format!("{base}/user"))
        .bearer_auth(&owner)
        .send()
        .await
        .expect("stale token");
    assert_eq!(resp.status(), 401);

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn follows_profiles_and_avatar_upload() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let alice = register(&client, base, "Alice", "alice@example.com").await;
    let bob = register(&client, base, "Bob", "bob@example.com").await;

    let me: Value = client
        .get(format!("{base}/user"))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("current user")
        .json()
        .await
        .expect("user json");
    let bob_id = me["data"]["id"].as_i64().expect("bob id");

    // Alice follows Bob; repeating converges on the same counts.
    for _ in 0..2 {
        let follow: Value = client
            .post(format!("{base}/users/{bob_id}/follow"))
            .bearer_auth(&alice)
            .send()
            .await
            .expect("follow")
            .json()
            .await
            .expect("follow json");
        assert_eq!(follow["data"]["followers_count"], 1);
    }

    // Self-follow is rejected outright.
    let resp = client
        .post(format!("{base}/users/{bob_id}/follow"))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("self follow");
    assert_eq!(resp.status(), 400);

    let profile: Value = client
        .get(format!("{base}/users/{bob_id}"))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("profile")
        .json()
        .await
        .expect("profile json");
    assert_eq!(profile["data"]["followers_count"], 1);
    assert_eq!(profile["data"]["is_following"], true);
    assert_eq!(profile["data"]["is_own_profile"], false);

    let followers: Value = client
        .get(format!("{base}/users/{bob_id}/followers"))
        .send()
        .await
        .expect("followers")
        .json()
        .await
        .expect("followers json");
    assert_eq!(followers["data"]["users"].as_array().unwrap().len(), 1);

    // Profile update is partial.
    let updated: Value = client
        .put(format!("{base}/user/profile"))
        .bearer_auth(&bob)
        .json(&json!({"username": "bobby", "bio": "hello"}))
        .send()
        .await
        .expect("update profile")
        .json()
        .await
        .expect("update json");
    assert_eq!(updated["data"]["username"], "bobby");
    assert_eq!(updated["data"]["name"], "Bob");

    // Avatar upload: sniffed as PNG, stored under a per-user name.
    let mut png = vec![0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    png.extend_from_slice(&[0; 64]);
    let form = reqwest::multipart::Form::new().part(
        "avatar",
        reqwest::multipart::Part::bytes(png)
            .file_name("me.png")
            .mime_str("image/png")
            .unwrap(),
    );
    let avatar: Value = client
        .post(format!("{base}/user/avatar"))
        .bearer_auth(&bob)
        .multipart(form)
        .send()
        .await
        .expect("avatar upload")
        .json()
        .await
        .expect("avatar json");
    assert_eq!(
        avatar["data"]["avatar"],
        format!("avatars/user_{bob_id}.png")
    );

    // Non-image payloads are rejected with a validation error.
    let form = reqwest::multipart::Form::new().part(
        "avatar",
        reqwest::multipart::Part::bytes(b"not an image".to_vec())
            .file_name("me.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let resp = client
        .post(format!("{base}/user/avatar"))
        .bearer_auth(&bob)
        .multipart(form)
        .send()
        .await
        .expect("bad avatar");
    assert_eq!(resp.status(), 422);

    // Unfollow drops the count and is idempotent.
    let unfollow: Value = client
        .delete(format!("{base}/users/{bob_id}/follow"))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("unfollow")
        .json()
        .await
        .expect("unfollow json");
    assert_eq!(unfollow["data"]["followers_count"], 0);

    server.shutdown().await;
}
