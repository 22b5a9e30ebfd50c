diesel::table! {
    products (id) {
        id -> Varchar,
        name -> Varchar,
        category -> Varchar,
        price -> Numeric,
        image -> Varchar,
        description -> Text,
        specs -> Jsonb,
        in_stock -> Bool,
        rating -> Float8,
        review_count -> Int4,
        stock_quantity -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    customers (id) {
        id -> Uuid,
        email -> Varchar,
        name -> Varchar,
        phone -> Nullable<Varchar>,
        address -> Nullable<Text>,
        city -> Nullable<Varchar>,
        state -> Nullable<Varchar>,
        postal_code -> Nullable<Varchar>,
        country -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        email -> Varchar,
        password_hash -> Varchar,
        first_name -> Varchar,
        last_name -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    orders (id) {
        id -> Uuid,
        customer_id -> Uuid,
        total_amount -> Numeric,
        status -> Varchar,
        shipping_address -> Nullable<Text>,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    order_items (id) {
        id -> Uuid,
        order_id -> Uuid,
        product_id -> Varchar,
        quantity -> Int4,
        unit_price -> Numeric,
        subtotal -> Numeric,
    }
}

diesel::table! {
    cart_items (session_id, product_id) {
        session_id -> Varchar,
        product_id -> Varchar,
        customer_id -> Nullable<Uuid>,
        quantity -> Int4,
        added_at -> Timestamptz,
    }
}

diesel::table! {
    product_reviews (id) {
        id -> Uuid,
        product_id -> Varchar,
        customer_id -> Nullable<Uuid>,
        rating -> Int4,
        review_text -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    outbox_events (id) {
        id -> Uuid,
        aggregate_id -> Uuid,
        event_type -> Varchar,
        event_data -> Jsonb,
        processed -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(order_items -> orders (order_id));
diesel::joinable!(order_items -> products (product_id));
diesel::joinable!(cart_items -> products (product_id));
diesel::joinable!(orders -> customers (customer_id));
diesel::joinable!(product_reviews -> products (product_id));

diesel::allow_tables_to_appear_in_same_query!(
    products,
    customers,
    users,
    orders,
    order_items,
    cart_items,
    product_reviews,
    outbox_events,
);
