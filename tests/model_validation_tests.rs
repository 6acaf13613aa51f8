use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use fitcoach::models::{
    Diet, DietRequest, ExerciseRequest, IntakeRequest, PatchDietRequest, PatchExerciseRequest,
    PatchUserRequest,
    PatchWorkoutRequest, Role, SignupRequest, UserProfile, UserRecord, WorkoutRequest,
};

// --- Roles ---

#[test]
fn test_role_accepts_names_and_legacy_codes() {
    for (raw, expected) in [
        ("student", Role::Student),
        ("A", Role::Student),
        ("nutritionist", Role::Nutritionist),
        ("N", Role::Nutritionist),
        ("trainer", Role::Trainer),
        ("P", Role::Trainer),
    ] {
        let parsed: Role = serde_json::from_value(json!(raw)).unwrap();
        assert_eq!(parsed, expected, "{raw}");
        assert_eq!(raw.parse::<Role>().unwrap(), expected);
    }

    assert!(serde_json::from_value::<Role>(json!("admin")).is_err());
    assert!("admin".parse::<Role>().is_err());
    assert_eq!(serde_json::to_value(Role::Trainer).unwrap(), json!("trainer"));
}

// --- Users ---

#[test]
fn test_user_profile_hides_password_hash() {
    let now = Utc::now();
    let record = UserRecord {
        id: Uuid::new_v4(),
        name: "Caio".to_string(),
        email: "caio@example.com".to_string(),
        username: "caio".to_string(),
        password_hash: "$argon2id$secret".to_string(),
        role: Role::Nutritionist,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    let json = serde_json::to_value(UserProfile::from(record)).unwrap();
    assert_eq!(json["type"], "nutritionist");
    assert!(json.get("password_hash").is_none());
    assert!(json.get("role").is_none());
    assert!(!json.to_string().contains("secret"));
}

#[test]
fn test_signup_rules() {
    let valid: SignupRequest = serde_json::from_value(json!({
        "name": "Caio",
        "email": "caio@example.com",
        "password": "pw",
        "type": "N",
    }))
    .unwrap();
    assert!(valid.validate().is_ok());
    assert_eq!(valid.username, None);

    let mut bad_email = valid.clone();
    bad_email.email = "not-an-email".to_string();
    assert!(bad_email.validate().is_err());

    let mut empty_username = valid.clone();
    empty_username.username = Some(String::new());
    assert!(empty_username.validate().is_err());

    assert!(serde_json::from_value::<SignupRequest>(json!({
        "name": "Caio",
        "email": "caio@example.com",
        "password": "pw",
    }))
    .is_err(), "type is required");
}

#[test]
fn test_user_patch_rejects_role_changes() {
    let attempt = serde_json::from_value::<PatchUserRequest>(json!({ "type": "trainer" }));
    assert!(attempt.is_err());

    let empty: PatchUserRequest = serde_json::from_value(json!({})).unwrap();
    assert!(empty.is_empty());
}

// --- Exercises ---

#[test]
fn test_exercise_counts_cannot_be_negative() {
    let ok: ExerciseRequest =
        serde_json::from_value(json!({ "name": "Squat", "reps": 10, "sets": 3, "timer": 60 })).unwrap();
    assert!(ok.validate().is_ok());

    let negative: ExerciseRequest =
        serde_json::from_value(json!({ "name": "Squat", "reps": -1, "sets": 3 })).unwrap();
    assert!(negative.validate().is_err());

    let nameless: ExerciseRequest =
        serde_json::from_value(json!({ "name": "", "reps": 1, "sets": 1 })).unwrap();
    assert!(nameless.validate().is_err());
}

#[test]
fn test_exercise_patch_reports_provided_fields() {
    let patch: PatchExerciseRequest =
        serde_json::from_value(json!({ "timer": 30, "name": "Plank" })).unwrap();
    assert_eq!(patch.provided_fields(), vec!["name", "timer"]);
    assert!(PatchExerciseRequest::default().provided_fields().is_empty());
}

// --- Workouts ---

#[test]
fn test_workout_accepts_legacy_exercise_key() {
    let req: WorkoutRequest = serde_json::from_value(json!({
        "name_plan": "Full body",
        "user": "7d0b7c44-5a0a-4b43-8d0e-3f1c2b9a6e11",
        "workouts": ["0b4f3e0c-9d1a-4d2c-8b7e-6a5f4e3d2c1b"],
    }))
    .unwrap();

    assert_eq!(req.exercises.len(), 1);
    assert!(req.students.is_empty());
    assert!(req.user.is_some());
}

#[test]
fn test_workout_patch_reports_provided_fields() {
    let patch: PatchWorkoutRequest =
        serde_json::from_value(json!({ "completed_exercises": [], "name_plan": "X" })).unwrap();
    assert_eq!(patch.provided_fields(), vec!["name_plan", "completed_exercises"]);

    let empty = PatchWorkoutRequest::default();
    assert!(empty.provided_fields().is_empty());

    assert!(serde_json::from_value::<PatchWorkoutRequest>(json!({ "created_by": "me" })).is_err());
}

// --- Diets ---

#[test]
fn test_diet_accepts_legacy_target_keys() {
    let req: DietRequest = serde_json::from_value(json!({
        "student": "7d0b7c44-5a0a-4b43-8d0e-3f1c2b9a6e11",
        "name_plan": "Bulk",
        "water_meta": 3000,
        "calories_meta": 2800.5,
    }))
    .unwrap();

    assert_eq!(req.water_target, 3000.0);
    assert_eq!(req.calories_target, 2800.5);
    assert_eq!(req.water_count, None);
    assert!(req.validate().is_ok());
}

#[test]
fn test_diet_values_cannot_be_negative() {
    let req: DietRequest = serde_json::from_value(json!({
        "student": "x",
        "name_plan": "Bulk",
        "water_target": -1,
        "calories_target": 100,
    }))
    .unwrap();
    assert!(req.validate().is_err());

    let intake: IntakeRequest = serde_json::from_value(json!({ "calories": -50 })).unwrap();
    assert!(intake.validate().is_err());
}

#[test]
fn test_diet_patch_reports_provided_fields() {
    let patch: PatchDietRequest =
        serde_json::from_value(json!({ "water_meta": 10, "calories_count": 5 })).unwrap();
    assert_eq!(patch.provided_fields(), vec!["water_target", "calories_count"]);
}

#[test]
fn test_roll_over_only_on_a_new_day() {
    let monday = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let now = Utc::now();
    let mut diet = Diet {
        id: Uuid::new_v4(),
        name_plan: "Plan".to_string(),
        student: Uuid::new_v4(),
        water_target: 2000.0,
        calories_target: 2000.0,
        water_count: 750.0,
        calories_count: 1200.0,
        last_reset: monday,
        created_by: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    assert!(!diet.roll_over(monday));
    assert_eq!(diet.water_count, 750.0);

    let tuesday = monday.succ_opt().unwrap();
    assert!(diet.roll_over(tuesday));
    assert_eq!(diet.water_count, 0.0);
    assert_eq!(diet.calories_count, 0.0);
    assert_eq!(diet.last_reset, tuesday);
    assert_eq!(diet.water_target, 2000.0);
}

#[test]
fn test_deleted_at_is_never_serialized() {
    let now = Utc::now();
    let diet = Diet {
        id: Uuid::new_v4(),
        name_plan: "Plan".to_string(),
        student: Uuid::new_v4(),
        water_target: 1.0,
        calories_target: 1.0,
        water_count: 0.0,
        calories_count: 0.0,
        last_reset: now.date_naive(),
        created_by: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        deleted_at: Some(now),
    };
    let json = serde_json::to_value(&diet).unwrap();
    assert!(json.get("deleted_at").is_none());
}
