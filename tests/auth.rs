use actix_web::{dev::Payload, test, FromRequest};
use comic_reader::{
    auth::{create_jwt, Auth, Claims, Role},
    error::ApiError,
    require_role,
};
use std::env;

// Helper that guarantees a sufficiently long secret for tests.
fn set_secret() {
    env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

#[actix_web::test]
async fn jwt_roundtrip_ok() {
    set_secret();
    let token = create_jwt("reader-42", vec![Role::Reader]).expect("token");
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    let auth = Auth::from_request(&req, &mut pl).await.expect("extract");
    assert_eq!(auth.0.sub, "reader-42");
    assert!(auth.0.roles.contains(&Role::Reader));
    assert!(!auth.is_admin());
}

#[actix_web::test]
async fn extractor_rejects_invalid_token() {
    set_secret();
    let req = test::TestRequest::default()
        .insert_header(("Authorization", "Bearer notatoken"))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
}

#[actix_web::test]
async fn extractor_requires_header() {
    set_secret();
    let req = test::TestRequest::default().to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
}

#[actix_web::test]
async fn require_role_macro_enforces_roles() {
    let publisher = Auth(Claims { sub: "p".into(), exp: usize::MAX, roles: vec![Role::Publisher] });
    let reader = Auth(Claims { sub: "r".into(), exp: usize::MAX, roles: vec![Role::Reader] });

    fn guarded(a: Auth) -> Result<(), ApiError> {
        require_role!(a, Role::Publisher | Role::Admin);
        Ok(())
    }
    assert!(guarded(publisher).is_ok());
    assert!(matches!(guarded(reader), Err(ApiError::Forbidden)));
}
