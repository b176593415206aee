// server/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{
  admin_handlers, application_handlers, auth_handlers, balance_handlers, complaint_handlers, favorite_handlers,
  guide_handlers, message_handlers, order_handlers, profile_handlers,
};

// Liveness only. Readiness against the pool is left to the orchestrator.
async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/me", web::get().to(auth_handlers::me_handler)),
      )
      .service(
        web::scope("/guides")
          .route("", web::get().to(guide_handlers::list_guides_handler))
          // Must precede `/{guide_id}`.
          .route("/me", web::get().to(guide_handlers::my_guide_handler))
          .route("/me", web::put().to(guide_handlers::update_my_guide_handler))
          .route("/{guide_id}", web::get().to(guide_handlers::get_guide_handler)),
      )
      .service(
        web::scope("/guide-applications")
          .route("", web::post().to(application_handlers::submit_application_handler))
          .route("/me", web::get().to(application_handlers::my_application_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}/assign-guide", web::post().to(order_handlers::assign_guide_handler))
          .route("/{order_id}/confirm-deposit", web::post().to(order_handlers::confirm_deposit_handler))
          .route(
            "/{order_id}/collect-final-payment",
            web::post().to(order_handlers::collect_final_payment_handler),
          )
          .route("/{order_id}/cancel", web::post().to(order_handlers::cancel_order_handler))
          .route("/{order_id}/refund-request", web::post().to(order_handlers::refund_request_handler))
          .route("/{order_id}/refund-decision", web::post().to(order_handlers::refund_decision_handler)),
      )
      .route("/balance", web::get().to(balance_handlers::get_balance_handler))
      .service(
        web::scope("/messages")
          .route("", web::post().to(message_handlers::send_message_handler))
          .route("/conversations", web::get().to(message_handlers::conversations_handler))
          .route("/with/{user_id}", web::get().to(message_handlers::thread_handler)),
      )
      .service(
        web::scope("/favorites")
          .route("", web::post().to(favorite_handlers::add_favorite_handler))
          .route("", web::get().to(favorite_handlers::list_favorites_handler))
          .route("/{guide_id}", web::delete().to(favorite_handlers::remove_favorite_handler)),
      )
      .service(
        web::scope("/complaints")
          .route("", web::post().to(complaint_handlers::create_complaint_handler))
          .route("", web::get().to(complaint_handlers::list_my_complaints_handler)),
      )
      .service(
        web::scope("/profile")
          .route("", web::get().to(profile_handlers::get_profile_handler))
          .route("", web::put().to(profile_handlers::update_profile_handler)),
      )
      .service(
        web::scope("/admin")
          .route("/users", web::get().to(admin_handlers::list_users_handler))
          .route(
            "/users/{user_id}/balance-adjustments",
            web::post().to(admin_handlers::balance_adjustment_handler),
          )
          .route("/orders", web::get().to(admin_handlers::list_orders_handler))
          .route("/guides/consistency", web::get().to(admin_handlers::consistency_report_handler))
          .route("/guides/consistency/fix", web::post().to(admin_handlers::consistency_fix_handler))
          .route("/guides/{guide_id}/suspend", web::post().to(admin_handlers::suspend_guide_handler))
          .route("/guides/{guide_id}/reinstate", web::post().to(admin_handlers::reinstate_guide_handler))
          .route(
            "/guide-applications",
            web::get().to(application_handlers::admin_list_applications_handler),
          )
          .route(
            "/guide-applications/{application_id}/review",
            web::post().to(application_handlers::review_application_handler),
          )
          .route("/complaints", web::get().to(complaint_handlers::admin_list_complaints_handler))
          .route(
            "/complaints/{complaint_id}",
            web::delete().to(complaint_handlers::admin_delete_complaint_handler),
          ),
      ),
  );
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::cookie::Cookie;
  use actix_web::http::StatusCode;
  use actix_web::{test, App};
  use companion_core::domain::Role;

  use crate::services::session_service::SESSION_COOKIE;
  use crate::test_support::{session_token, test_state};

  #[actix_rt::test]
  async fn health_is_public() {
    let app = test::init_service(App::new().configure(configure_app_routes)).await;
    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
  }

  #[actix_rt::test]
  async fn me_without_a_cookie_is_unauthorized() {
    let app = test::init_service(
      App::new()
        .app_data(web::Data::new(test_state()))
        .configure(configure_app_routes),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[actix_rt::test]
  async fn a_tampered_cookie_is_rejected() {
    let app = test::init_service(
      App::new()
        .app_data(web::Data::new(test_state()))
        .configure(configure_app_routes),
    )
    .await;
    let (_, token) = session_token(Role::User);
    let mut forged = token.clone();
    forged.push('0');
    let req = test::TestRequest::get()
      .uri("/api/v1/auth/me")
      .cookie(Cookie::new(SESSION_COOKIE, forged))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[actix_rt::test]
  async fn admin_routes_reject_regular_users_before_any_query() {
    let app = test::init_service(
      App::new()
        .app_data(web::Data::new(test_state()))
        .configure(configure_app_routes),
    )
    .await;
    let (_, token) = session_token(Role::User);
    for uri in ["/api/v1/admin/users", "/api/v1/admin/complaints", "/api/v1/admin/guides/consistency"] {
      let req = test::TestRequest::get()
        .uri(uri)
        .cookie(Cookie::new(SESSION_COOKIE, token.clone()))
        .to_request();
      let resp = test::call_service(&app, req).await;
      assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
  }
}
