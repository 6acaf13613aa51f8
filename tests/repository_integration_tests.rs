use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fitcoach::{
    MemoryRepository, PostgresRepository,
    models::{Diet, Exercise, Role, UserRecord, Workout},
    policy::Scope,
    repository::{ListFilter, Repository, RepositoryError, UniqueField},
};

// --- Test Data Helpers ---

fn user(role: Role, email: &str, username: &str) -> UserRecord {
    let now = Utc::now();
    UserRecord {
        id: Uuid::new_v4(),
        name: "Repo User".to_string(),
        email: email.to_string(),
        username: username.to_string(),
        password_hash: "$argon2id$placeholder".to_string(),
        role,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn exercise(owner: Uuid) -> Exercise {
    let now = Utc::now();
    Exercise {
        id: Uuid::new_v4(),
        name: "Deadlift".to_string(),
        machine: None,
        reps: 5,
        sets: 5,
        timer: Some(120),
        created_by: owner,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn workout(owner: Uuid, students: Vec<Uuid>) -> Workout {
    let now = Utc::now();
    Workout {
        id: Uuid::new_v4(),
        name_plan: "Pull".to_string(),
        students,
        exercises: vec![Uuid::new_v4()],
        completed_exercises: vec![],
        created_by: owner,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn diet(owner: Uuid, student: Uuid) -> Diet {
    let now = Utc::now();
    Diet {
        id: Uuid::new_v4(),
        name_plan: "Lean".to_string(),
        student,
        water_target: 2500.0,
        calories_target: 2100.0,
        water_count: 300.0,
        calories_count: 400.0,
        last_reset: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        created_by: owner,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

/// Stores an account to own documents; `created_by` is a foreign key in Postgres.
async fn owner(repo: &dyn Repository, role: Role) -> Uuid {
    let suffix = Uuid::new_v4().simple().to_string();
    repo.insert_user(user(role, &format!("owner-{suffix}@example.com"), &format!("owner{suffix}")))
        .await
        .unwrap()
        .id
}

// --- Shared Contract Checks ---
// Run against both implementations so the in-memory store keeps the same
// scoping and soft-delete semantics as Postgres.

async fn check_user_uniqueness_survives_deletion(repo: &dyn Repository) {
    let suffix = Uuid::new_v4().simple().to_string();
    let email = format!("keep-{suffix}@example.com");
    let username = format!("keep{suffix}");

    let stored = repo
        .insert_user(user(Role::Student, &email, &username))
        .await
        .unwrap();
    assert!(repo.email_taken(&email, None).await.unwrap());
    assert!(!repo.email_taken(&email, Some(stored.id)).await.unwrap());

    assert!(repo.soft_delete_user(stored.id).await.unwrap());
    assert!(repo.find_user_by_id(stored.id).await.unwrap().is_none());
    assert!(repo.find_user_by_email(&email).await.unwrap().is_none());
    assert!(repo.email_taken(&email, None).await.unwrap());
    assert!(repo.username_taken(&username, None).await.unwrap());
    assert!(!repo.soft_delete_user(stored.id).await.unwrap());
}

async fn check_user_writes_reject_taken_fields(repo: &dyn Repository) {
    let suffix = Uuid::new_v4().simple().to_string();
    let first = repo
        .insert_user(user(Role::Trainer, &format!("a-{suffix}@example.com"), &format!("a{suffix}")))
        .await
        .unwrap();
    let second = repo
        .insert_user(user(Role::Student, &format!("b-{suffix}@example.com"), &format!("b{suffix}")))
        .await
        .unwrap();

    let same_email = user(Role::Student, &first.email, &format!("c{suffix}"));
    assert!(matches!(
        repo.insert_user(same_email).await,
        Err(RepositoryError::Conflict(UniqueField::Email))
    ));
    let same_username = user(Role::Student, &format!("c-{suffix}@example.com"), &first.username);
    assert!(matches!(
        repo.insert_user(same_username).await,
        Err(RepositoryError::Conflict(UniqueField::Username))
    ));

    let mut renamed = second.clone();
    renamed.username = first.username.clone();
    assert!(matches!(
        repo.update_user(&renamed).await,
        Err(RepositoryError::Conflict(UniqueField::Username))
    ));
    let stored = repo.find_user_by_id(second.id).await.unwrap().unwrap();
    assert_eq!(stored.username, second.username);

    // Keeping one's own values is not a collision.
    renamed.username = second.username.clone();
    renamed.name = "Renamed".to_string();
    let updated = repo.update_user(&renamed).await.unwrap().unwrap();
    assert_eq!(updated.name, "Renamed");

    repo.soft_delete_user(first.id).await.unwrap();
    let found = repo.find_users_by_ids(&[first.id, second.id]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, second.id);
}

async fn check_exercise_scope(repo: &dyn Repository) {
    let owner = owner(repo, Role::Trainer).await;
    let other = Uuid::new_v4();
    let stored = repo.insert_exercise(exercise(owner)).await.unwrap();

    assert!(repo.find_exercise(stored.id, Scope::Owner(owner)).await.unwrap().is_some());
    assert!(repo.find_exercise(stored.id, Scope::Owner(other)).await.unwrap().is_none());
    assert!(repo.find_exercise(stored.id, Scope::Nothing).await.unwrap().is_none());

    let mut renamed = stored.clone();
    renamed.name = "Romanian deadlift".to_string();
    assert!(repo.update_exercise(&renamed, Scope::Owner(other)).await.unwrap().is_none());
    let updated = repo
        .update_exercise(&renamed, Scope::Owner(owner))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Romanian deadlift");

    let listed = repo
        .list_exercises(ListFilter::scoped(Scope::Owner(owner)))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    assert!(!repo.delete_exercise(stored.id, Scope::Owner(other)).await.unwrap());
    let kept = repo.insert_exercise(exercise(owner)).await.unwrap();
    assert!(repo.delete_exercise(stored.id, Scope::Owner(owner)).await.unwrap());
    assert!(repo.find_exercise(stored.id, Scope::Owner(owner)).await.unwrap().is_none());
    let found = repo.find_exercises_by_ids(&[stored.id, kept.id]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, kept.id);
    assert!(repo.delete_exercise(kept.id, Scope::Owner(owner)).await.unwrap());
    assert!(
        repo.list_exercises(ListFilter::scoped(Scope::Owner(owner)))
            .await
            .unwrap()
            .is_empty()
    );
}

async fn check_workout_recipients_and_filters(repo: &dyn Repository) {
    let trainer = owner(repo, Role::Trainer).await;
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    let shared = repo.insert_workout(workout(trainer, vec![first, second])).await.unwrap();
    let solo = repo.insert_workout(workout(trainer, vec![first])).await.unwrap();

    let for_second = repo
        .list_workouts(ListFilter::scoped(Scope::Recipient(second)))
        .await
        .unwrap();
    assert_eq!(for_second.len(), 1);
    assert_eq!(for_second[0].id, shared.id);
    assert_eq!(for_second[0].students, vec![first, second]);

    let mut filter = ListFilter::scoped(Scope::Owner(trainer));
    filter.student = Some(first);
    assert_eq!(repo.list_workouts(filter).await.unwrap().len(), 2);
    filter.student = Some(second);
    assert_eq!(repo.list_workouts(filter).await.unwrap().len(), 1);
    filter.created_by = Some(Uuid::new_v4());
    assert!(repo.list_workouts(filter).await.unwrap().is_empty());

    assert!(repo.find_workout(solo.id, Scope::Recipient(second)).await.unwrap().is_none());

    let mut progress = solo.clone();
    progress.completed_exercises = progress.exercises.clone();
    let updated = repo
        .update_workout(&progress, Scope::Recipient(first))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.completed_exercises, solo.exercises);
}

async fn check_progress_write_keeps_plan_edits(repo: &dyn Repository) {
    let trainer = owner(repo, Role::Trainer).await;
    let student = Uuid::new_v4();
    let stored = repo.insert_workout(workout(trainer, vec![student])).await.unwrap();

    // The student reads, the trainer edits, then the student saves progress.
    let seen = repo
        .find_workout(stored.id, Scope::Recipient(student))
        .await
        .unwrap()
        .unwrap();
    let mut edited = stored.clone();
    edited.name_plan = "Pull, heavier".to_string();
    repo.update_workout(&edited, Scope::Owner(trainer)).await.unwrap().unwrap();

    let saved = repo
        .set_completed_exercises(stored.id, &seen.exercises, Scope::Recipient(student))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.completed_exercises, seen.exercises);
    assert_eq!(saved.name_plan, "Pull, heavier");

    let outsider = Uuid::new_v4();
    assert!(
        repo.set_completed_exercises(stored.id, &[], Scope::Recipient(outsider))
            .await
            .unwrap()
            .is_none()
    );
}

async fn check_diet_round_trip(repo: &dyn Repository) {
    let nutritionist = owner(repo, Role::Nutritionist).await;
    let student = Uuid::new_v4();
    let stored = repo.insert_diet(diet(nutritionist, student)).await.unwrap();

    let seen = repo
        .find_diet(stored.id, Scope::Recipient(student))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen.water_count, 300.0);
    assert_eq!(seen.last_reset, stored.last_reset);

    let mut reset = seen.clone();
    let today = NaiveDate::from_ymd_opt(2025, 2, 2).unwrap();
    assert!(reset.roll_over(today));
    let persisted = repo
        .update_diet(&reset, Scope::Recipient(student))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(persisted.water_count, 0.0);
    assert_eq!(persisted.last_reset, today);

    assert!(repo.delete_diet(stored.id, Scope::Owner(nutritionist)).await.unwrap());
    assert!(repo.find_diet(stored.id, Scope::Recipient(student)).await.unwrap().is_none());
}

// --- In-Memory Repository ---

#[tokio::test]
async fn test_memory_user_uniqueness_survives_deletion() {
    check_user_uniqueness_survives_deletion(&MemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_user_writes_reject_taken_fields() {
    check_user_writes_reject_taken_fields(&MemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_progress_write_keeps_plan_edits() {
    check_progress_write_keeps_plan_edits(&MemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_exercise_scope() {
    check_exercise_scope(&MemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_workout_recipients_and_filters() {
    check_workout_recipients_and_filters(&MemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_diet_round_trip() {
    check_diet_round_trip(&MemoryRepository::new()).await;
}

// --- Postgres Repository ---
// Needs a reachable database: DATABASE_URL=... cargo test -- --ignored

async fn postgres() -> PostgresRepository {
    dotenv::dotenv().ok();
    let db_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run integration tests");
    let pool = PgPool::connect(&db_url)
        .await
        .expect("Failed to connect to database for integration tests.");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations.");
    PostgresRepository::new(pool)
}

#[tokio::test]
#[ignore]
async fn test_postgres_user_uniqueness_survives_deletion() {
    check_user_uniqueness_survives_deletion(&postgres().await).await;
}

#[tokio::test]
#[ignore]
async fn test_postgres_user_writes_reject_taken_fields() {
    check_user_writes_reject_taken_fields(&postgres().await).await;
}

#[tokio::test]
#[ignore]
async fn test_postgres_progress_write_keeps_plan_edits() {
    check_progress_write_keeps_plan_edits(&postgres().await).await;
}

#[tokio::test]
#[ignore]
async fn test_postgres_exercise_scope() {
    check_exercise_scope(&postgres().await).await;
}

#[tokio::test]
#[ignore]
async fn test_postgres_workout_recipients_and_filters() {
    check_workout_recipients_and_filters(&postgres().await).await;
}

#[tokio::test]
#[ignore]
async fn test_postgres_diet_round_trip() {
    check_diet_round_trip(&postgres().await).await;
}
