use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookstore API",
        version = "0.2.0",
        description = r#"
# Online Bookstore API

Catalog browsing, cart management, checkout with inventory control, and
order administration, gated by role-based bearer authentication.

## Authentication

Obtain a token via `POST /api/auth/login` and send it on every protected
request:

```
Authorization: Bearer <token>
```

Requests without a resolvable identity, and requests with the wrong role,
are both rejected with 401.

## Checkout

`POST /api/cart/checkout` converts the whole cart atomically: stock is
checked and decremented, one order row is created per cart line (sharing a
`checkoutId`), and the cart is emptied, all or nothing. A concurrent stock
change rejects the entire checkout; resubmit it in full.
"#
    ),
    paths(
        // Cart
        crate::handlers::cart::get_cart,
        crate::handlers::cart::add_cart_item,
        crate::handlers::cart::update_cart_item,
        crate::handlers::cart::remove_cart_item,
        crate::handlers::cart::clear_cart,
        crate::handlers::cart::checkout,

        // Orders
        crate::handlers::orders::get_orders,
        crate::handlers::orders::get_user_orders,
        crate::handlers::orders::update_order_status,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::cart::AddCartItemRequest,
        crate::handlers::cart::UpdateCartItemRequest,
        crate::handlers::cart::CheckoutRequest,
        crate::handlers::orders::UpdateOrderStatusRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "cart", description = "Cart management and checkout"),
        (name = "orders", description = "Order queries and administration"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI mounted at `/swagger-ui`, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
