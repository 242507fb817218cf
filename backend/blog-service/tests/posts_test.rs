#[macro_use]
mod common;

use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::test;
use blog_service::db::BlogStore;
use blog_service::forms::{INVALID_CHOICE, INVALID_IMAGE, REQUIRED};
use blog_service::models::PostFilter;
use common::{gif_upload, multipart_body, FilePart, TestBlog};
use serde_json::Value;

fn location<B>(resp: &ServiceResponse<B>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[actix_web::test]
async fn anonymous_create_redirects_to_login() {
    let blog = TestBlog::new();
    let app = init_app!(blog);

    let req = test::TestRequest::get().uri("/create/").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");
}

#[actix_web::test]
async fn create_form_lists_group_choices() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    blog.group("cats", "Cats").await;
    let app = init_app!(blog);

    let req = test::TestRequest::get()
        .uri("/create/")
        .cookie(blog.session(&leo))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["is_edit"], false);
    assert_eq!(body["form"]["text"], "");
    assert_eq!(body["form"]["groups"][0]["title"], "Cats");
}

#[actix_web::test]
async fn valid_post_is_saved_and_redirects_to_profile() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    let group = blog.group("cats", "Cats").await;
    let app = init_app!(blog);

    let group_id = group.id.to_string();
    let (content_type, payload) = multipart_body(
        &[("text", "  A brand new post  "), ("group", &group_id)],
        Some(gif_upload("small.gif")),
    );
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(blog.session(&leo))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/leo/");

    let posts = blog.store.list_posts(PostFilter::All, 10, 0).await.unwrap();
    assert_eq!(posts.len(), 1);
    let record = &posts[0];
    assert_eq!(record.post.text, "A brand new post");
    assert_eq!(record.author.id, leo.id);
    assert_eq!(record.post.group_id, Some(group.id));
    assert_eq!(record.post.image.as_deref(), Some("posts/small.gif"));
    assert!(blog.media_dir.path().join("posts/small.gif").exists());
}

#[actix_web::test]
async fn invalid_post_rerenders_form_without_saving() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    let app = init_app!(blog);

    let (content_type, payload) = multipart_body(&[("text", "   "), ("group", "999")], None);
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(blog.session(&leo))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["is_edit"], false);
    assert_eq!(body["form"]["errors"]["text"][0], REQUIRED);
    assert_eq!(body["form"]["errors"]["group"][0], INVALID_CHOICE);

    assert_eq!(blog.store.count_posts(PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn non_image_upload_is_rejected() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    let app = init_app!(blog);

    let (content_type, payload) = multipart_body(
        &[("text", "with a fake picture")],
        Some(FilePart {
            field: "image",
            file_name: "fake.gif",
            content_type: "image/gif",
            data: b"definitely not a gif",
        }),
    );
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(blog.session(&leo))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["form"]["errors"]["image"][0], INVALID_IMAGE);
    assert_eq!(blog.store.count_posts(PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn author_can_edit_post() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    let group = blog.group("cats", "Cats").await;
    let post = blog.post(&leo, "Original text", Some(&group)).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(blog.session(&leo))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["is_edit"], true);
    assert_eq!(body["form"]["text"], "Original text");
    assert_eq!(body["post"]["id"], post.id);

    let (content_type, payload) = multipart_body(&[("text", "Edited text"), ("group", "")], None);
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(blog.session(&leo))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let record = blog.store.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(record.post.text, "Edited text");
    assert_eq!(record.post.group_id, None);
    assert_eq!(record.post.created_at, post.created_at);
    assert_eq!(record.author.id, leo.id);
}

#[actix_web::test]
async fn edit_with_same_group_keeps_group_and_author() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    let cats = blog.group("cats", "Cats").await;
    let post = blog.post(&leo, "Original text", Some(&cats)).await;
    let app = init_app!(blog);

    let group_id = cats.id.to_string();
    let (content_type, payload) =
        multipart_body(&[("text", "Reworded text"), ("group", &group_id)], None);
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(blog.session(&leo))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let record = blog.store.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(record.post.text, "Reworded text");
    assert_eq!(record.post.group_id, Some(cats.id));
    assert_eq!(record.group.map(|g| g.slug), Some(cats.slug));
    assert_eq!(record.author.id, leo.id);
    assert_eq!(record.post.created_at, post.created_at);
}

#[actix_web::test]
async fn edit_keeps_or_clears_the_image() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    let app = init_app!(blog);

    let (content_type, payload) =
        multipart_body(&[("text", "With picture")], Some(gif_upload("small.gif")));
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(blog.session(&leo))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    test::call_service(&app, req).await;
    let post = blog.store.list_posts(PostFilter::All, 1, 0).await.unwrap()[0]
        .post
        .clone();

    let (content_type, payload) = multipart_body(&[("text", "Still with picture")], None);
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(blog.session(&leo))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    test::call_service(&app, req).await;
    let kept = blog.store.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(kept.post.image.as_deref(), Some("posts/small.gif"));

    let (content_type, payload) =
        multipart_body(&[("text", "No picture"), ("image-clear", "on")], None);
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(blog.session(&leo))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    test::call_service(&app, req).await;
    let cleared = blog.store.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(cleared.post.image, None);
}

#[actix_web::test]
async fn non_author_edit_silently_redirects() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    let mia = blog.user("mia").await;
    let post = blog.post(&leo, "Leo's post", None).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(blog.session(&mia))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let (content_type, payload) = multipart_body(&[("text", "Hijacked")], None);
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(blog.session(&mia))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let record = blog.store.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(record.post.text, "Leo's post");
}

#[actix_web::test]
async fn anonymous_edit_redirects_to_login() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    let post = blog.post(&leo, "Leo's post", None).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        location(&resp),
        format!("/auth/login/?next=/posts/{}/edit/", post.id)
    );
}

#[actix_web::test]
async fn detail_shows_post_comments_and_form_for_users() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    let group = blog.group("cats", "Cats").await;
    let post = blog.post(&leo, "A post about cats", Some(&group)).await;
    blog.post(&leo, "Another one", None).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["post"]["text"], "A post about cats");
    assert_eq!(body["post"]["preview"], "A post about ca");
    assert_eq!(body["post"]["author"]["username"], "leo");
    assert_eq!(body["post"]["group"]["slug"], "cats");
    assert_eq!(body["posts_count"], 2);
    assert_eq!(body["comments"], serde_json::json!([]));
    assert!(body["form"].is_null());

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .cookie(blog.session(&leo))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["form"].is_object());
}

#[actix_web::test]
async fn unknown_resources_are_not_found() {
    let blog = TestBlog::new();
    blog.user("leo").await;
    let app = init_app!(blog);

    for uri in [
        "/posts/999/",
        "/posts/not-a-number/",
        "/group/nope/",
        "/profile/nobody/",
        "/unexisting_page/",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn paths_without_trailing_slash_are_normalized() {
    let blog = TestBlog::new();
    let leo = blog.user("leo").await;
    let post = blog.post(&leo, "Slashless", None).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}", post.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/about/tech").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["page"], "tech");
}
