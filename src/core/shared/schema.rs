diesel::table! {
    workspaces (id) {
        id -> Uuid,
        name -> Text,
        plan -> Nullable<Text>,
        subscription_status -> Nullable<Text>,
        default_reorder_threshold -> Nullable<Numeric>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    products (id) {
        id -> Uuid,
        workspace_id -> Uuid,
        name -> Text,
        reorder_threshold -> Numeric,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    inventory_balances (id) {
        id -> Uuid,
        workspace_id -> Uuid,
        product_id -> Uuid,
        quantity_on_hand -> Numeric,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    inventory_movements (id) {
        id -> Uuid,
        workspace_id -> Uuid,
        product_id -> Uuid,
        quantity_change -> Numeric,
        reason -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    sales (id) {
        id -> Uuid,
        workspace_id -> Uuid,
        product_id -> Uuid,
        quantity_sold -> Numeric,
        unit_price -> Numeric,
        payment_status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    expenses (id) {
        id -> Uuid,
        workspace_id -> Uuid,
        name -> Text,
        amount -> Numeric,
        category -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(products -> workspaces (workspace_id));
diesel::joinable!(inventory_balances -> products (product_id));
diesel::joinable!(inventory_movements -> products (product_id));
diesel::joinable!(sales -> products (product_id));
diesel::joinable!(expenses -> workspaces (workspace_id));

diesel::allow_tables_to_appear_in_same_query!(
    workspaces,
    products,
    inventory_balances,
    inventory_movements,
    sales,
    expenses,
);
