//! Course administration tools: listing, participants, creation.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{require_str, Tool};
use crate::moodle::MoodleClient;

/// The front-page "course" has format `site`; hidden courses have
/// `visible: 0`. Neither belongs in an administrative course listing.
fn is_listable(course: &Value) -> bool {
    if course.get("format").and_then(Value::as_str) == Some("site") {
        return false;
    }
    match course.get("visible") {
        Some(Value::Bool(b)) => *b,
        Some(v) => v.as_i64().unwrap_or(1) != 0,
        None => true,
    }
}

// ── ListAllCoursesTool ─────────────────────────────────────────────

pub struct ListAllCoursesTool {
    client: Arc<MoodleClient>,
}

impl ListAllCoursesTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListAllCoursesTool {
    fn name(&self) -> &str {
        "list_all_courses"
    }

    fn description(&self) -> &str {
        "Devuelve una lista con la información de todos los cursos visibles \
         disponibles en la plataforma Moodle."
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, _args: HashMap<String, Value>) -> String {
        match self.client.call("core_course_get_courses", &[]).await {
            Ok(body) => {
                let visible: Vec<&Value> = body
                    .as_array()
                    .map(|courses| courses.iter().filter(|c| is_listable(c)).collect())
                    .unwrap_or_default();
                serde_json::to_string(&visible).unwrap_or_else(|_| "[]".into())
            }
            Err(e) => e.to_string(),
        }
    }
}

// ── GetCourseParticipantsTool ──────────────────────────────────────

pub struct GetCourseParticipantsTool {
    client: Arc<MoodleClient>,
}

impl GetCourseParticipantsTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetCourseParticipantsTool {
    fn name(&self) -> &str {
        "get_course_participants"
    }

    fn description(&self) -> &str {
        "Obtiene la lista completa de participantes (profesores y alumnos) de \
         un curso específico, usando el ID del curso."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "course_id": {"type": "integer", "description": "ID numérico del curso"}
            },
            "required": ["course_id"]
        })
    }

    async fn execute(&self, args: HashMap<String, Value>) -> String {
        let Some(course_id) = args.get("course_id").and_then(Value::as_i64) else {
            return "Error: el parámetro 'course_id' es obligatorio.".into();
        };

        let params = vec![("courseid".to_string(), course_id.to_string())];
        match self
            .client
            .call("core_enrol_get_enrolled_users", &params)
            .await
        {
            Ok(body) => body.to_string(),
            Err(e) => e.to_string(),
        }
    }
}

// ── CreateCourseTool ───────────────────────────────────────────────

pub struct CreateCourseTool {
    client: Arc<MoodleClient>,
}

impl CreateCourseTool {
    pub fn new(client: Arc<MoodleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateCourseTool {
    fn name(&self) -> &str {
        "create_course"
    }

    fn description(&self) -> &str {
        "Crea un nuevo curso en Moodle. Requiere un nombre completo, un nombre \
         corto y el ID de la categoría."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "full_name": {"type": "string", "description": "Nombre completo del curso"},
                "short_name": {"type": "string", "description": "Nombre corto (único)"},
                "category_id": {"type": "integer", "description": "ID de la categoría donde crearlo"}
            },
            "required": ["full_name", "short_name", "category_id"]
        })
    }

    async fn execute(&self, args: HashMap<String, Value>) -> String {
        let full_name = match require_str(&args, "full_name") {
            Ok(v) => v,
            Err(msg) => return msg,
        };
        let short_name = match require_str(&args, "short_name") {
            Ok(v) => v,
            Err(msg) => return msg,
        };
        let Some(category_id) = args.get("category_id").and_then(Value::as_i64) else {
            return "Error: el parámetro 'category_id' es obligatorio.".into();
        };

        let params = vec![
            MoodleClient::entry("courses", 0, "fullname", full_name),
            MoodleClient::entry("courses", 0, "shortname", short_name),
            MoodleClient::entry("courses", 0, "categoryid", category_id),
        ];

        match self.client.call("core_course_create_courses", &params).await {
            Ok(body) => body.to_string(),
            Err(e) => e.to_string(),
        }
    }
}
