use dz_storefront_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    password,
};
use uuid::Uuid;

/// Parent node of a seeded category: its id, department and depth.
#[derive(Clone, Copy)]
struct Parent {
    id: Uuid,
    department_id: Option<Uuid>,
    depth: i16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_staff(&pool, "admin@boutique.dz", "admin123", "admin").await?;
    ensure_staff(&pool, "vendeur@boutique.dz", "vendeur123", "staff").await?;
    let laptops = seed_categories(&pool).await?;
    seed_products(&pool, laptops).await?;
    seed_settings(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_staff(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let credentials = password::derive(password, None);

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO staff_users (id, email, password_hash, password_salt, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(credentials.hash)
    .bind(credentials.salt)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured staff {email} (role={role})");
    Ok(id)
}

async fn ensure_category(
    pool: &sqlx::PgPool,
    parent: Option<Parent>,
    name_fr: &str,
    name_ar: &str,
    slug: &str,
    sort_order: i32,
) -> anyhow::Result<Parent> {
    let parent_id = parent.map(|p| p.id);
    let department_id = parent.map(|p| p.department_id.unwrap_or(p.id));
    let depth = parent.map_or(1, |p| p.depth + 1);

    let existing: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM categories WHERE slug = $1 AND department_id IS NOT DISTINCT FROM $2",
    )
    .bind(slug)
    .bind(department_id)
    .fetch_optional(pool)
    .await?;

    let id = match existing {
        Some((id,)) => id,
        None => {
            let id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO categories
                    (id, parent_id, department_id, depth, name_fr, name_ar, slug, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(id)
            .bind(parent_id)
            .bind(department_id)
            .bind(depth)
            .bind(name_fr)
            .bind(name_ar)
            .bind(slug)
            .bind(sort_order)
            .execute(pool)
            .await?;
            id
        }
    };

    Ok(Parent {
        id,
        department_id,
        depth,
    })
}

/// Seeds a small department tree and returns the laptops subcategory.
async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<Parent> {
    let computers = ensure_category(pool, None, "Informatique", "إعلام آلي", "informatique", 0).await?;
    ensure_category(pool, None, "Composants", "مكونات", "composants", 1).await?;
    ensure_category(pool, None, "Périphériques", "ملحقات", "peripheriques", 2).await?;

    let portables =
        ensure_category(pool, Some(computers), "Ordinateurs portables", "حواسيب محمولة", "portables", 0).await?;
    ensure_category(pool, Some(computers), "Ordinateurs de bureau", "حواسيب مكتبية", "bureau", 1).await?;
    let gaming = ensure_category(pool, Some(portables), "Portables gaming", "محمولة للألعاب", "gaming", 0).await?;
    ensure_category(pool, Some(portables), "Ultrabooks", "حواسيب خفيفة", "ultrabooks", 1).await?;

    println!("Seeded categories");
    Ok(gaming)
}

async fn seed_products(pool: &sqlx::PgPool, category: Parent) -> anyhow::Result<()> {
    let products = vec![
        ("Lenovo Legion 5", "لينوفو ليجن 5", "lenovo-legion-5", 215000_i64, 8),
        ("ASUS TUF A15", "أسوس توف A15", "asus-tuf-a15", 178000, 12),
        ("MSI Katana 15", "إم إس آي كاتانا 15", "msi-katana-15", 189000, 5),
    ];

    for (name_fr, name_ar, slug, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name_fr, name_ar, slug, price_dzd, stock, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name_fr)
        .bind(name_ar)
        .bind(slug)
        .bind(price)
        .bind(stock)
        .bind(category.id)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_settings(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO store_settings (id, store_name, contact_phone, contact_email, address)
        VALUES (1, $1, $2, $3, $4)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind("Boutique Informatique")
    .bind("0555 00 00 00")
    .bind("contact@boutique.dz")
    .bind("Alger Centre, Alger")
    .execute(pool)
    .await?;

    println!("Seeded store settings");
    Ok(())
}
