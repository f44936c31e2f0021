//! The `course` namespace: course and lecture endpoints.
//!
//! Collection queries degrade to an empty collection on a malformed payload
//! (downstream UI iterates them unconditionally); single-item queries unwrap
//! their envelope and degrade to `null`. Both degradations are declared
//! transforms, so they surface as [`Shaped::Defaulted`] in the logs rather
//! than silently at call sites.
//!
//! Tag scheme: the `Courses` bare tag covers every collection query, a
//! `Course:{id}` tag covers one course, and `Lectures:{courseId}` covers one
//! course's lecture list. Lecture writes invalidate the bare `Course` type
//! (course documents embed their lectures) plus the affected lecture list.

use serde_json::Value;
use url::form_urlencoded;

use crate::endpoint::{EndpointDescriptor, Registry, RegistryError, Shaped};
use crate::error::ApiError;
use crate::request::RequestSpec;
use crate::tag::Tag;

/// `GET /course/`
pub const GET_COURSES: &str = "course.getCourses";
/// `GET /course/creator`
pub const GET_CREATOR_COURSES: &str = "course.getCreatorCourses";
/// `GET /course/?category=&difficulty=&search=`
pub const GET_COURSES_WITH_FILTER: &str = "course.getCoursesWithFilter";
/// `GET /course/{id}`
pub const GET_COURSE: &str = "course.getCourse";
/// `POST /course/`
pub const CREATE_COURSE: &str = "course.createCourse";
/// `PUT /course/{id}`
pub const UPDATE_COURSE: &str = "course.updateCourse";
/// `PATCH /course/{id}?publish={bool}`
pub const TOGGLE_PUBLISH: &str = "course.togglePublish";
/// `DELETE /course/{id}`
pub const DELETE_COURSE: &str = "course.deleteCourse";
/// `GET /course/{id}/lecture`
pub const GET_LECTURES: &str = "course.getLectures";
/// `POST /course/{id}/lecture`
pub const CREATE_LECTURE: &str = "course.createLecture";
/// `GET /lecture/{lid}`
pub const GET_LECTURE: &str = "course.getLecture";
/// `POST /course/{id}/lecture/{lid}`
pub const UPDATE_LECTURE: &str = "course.updateLecture";
/// `DELETE /lecture/{lid}`
pub const DELETE_LECTURE: &str = "course.deleteLecture";

/// Registers the course and lecture endpoints.
pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(
        EndpointDescriptor::query(GET_COURSES, |_| Ok(RequestSpec::get("/course/")))
            .transform(|raw| Ok(array_or_empty(raw)))
            .provides(|_, _| vec![Tag::of("Courses")]),
    )?;

    registry.register(
        EndpointDescriptor::query(GET_CREATOR_COURSES, |_| Ok(RequestSpec::get("/course/creator")))
            .transform(|raw| {
                if raw.get("courses").is_some_and(Value::is_array) {
                    Ok(Shaped::Valid(raw))
                } else {
                    Ok(Shaped::Defaulted(serde_json::json!({"courses": []})))
                }
            })
            .provides(|_, _| vec![Tag::of("Courses")]),
    )?;

    registry.register(
        EndpointDescriptor::query(GET_COURSES_WITH_FILTER, |args| {
            Ok(RequestSpec::get(filter_path(args)))
        })
        .transform(|raw| Ok(array_or_empty(raw)))
        .provides(|_, _| vec![Tag::of("Courses")]),
    )?;

    registry.register(
        EndpointDescriptor::query(GET_COURSE, |args| {
            Ok(RequestSpec::get(format!("/course/{}", str_arg(args, "courseId")?)))
        })
        .transform(|raw| Ok(unwrap_envelope(raw, "course")))
        .provides(|_, args| vec![Tag::item("Course", id_of(args, "courseId"))]),
    )?;

    registry.register(
        EndpointDescriptor::mutation(CREATE_COURSE, |args| {
            Ok(RequestSpec::post("/course/").json(args.clone()))
        })
        .invalidates(|_| vec![Tag::of("Courses")]),
    )?;

    registry.register(
        EndpointDescriptor::mutation(UPDATE_COURSE, |args| {
            let id = str_arg(args, "courseId")?;
            let body = args.get("data").cloned().unwrap_or(Value::Null);
            Ok(RequestSpec::put(format!("/course/{id}")).json(body))
        })
        .invalidates(|args| {
            vec![Tag::of("Courses"), Tag::item("Course", id_of(args, "courseId"))]
        }),
    )?;

    registry.register(
        EndpointDescriptor::mutation(TOGGLE_PUBLISH, |args| {
            let id = str_arg(args, "courseId")?;
            let publish = args
                .get("publish")
                .and_then(Value::as_bool)
                .ok_or_else(|| ApiError::transform("missing `publish` argument"))?;
            Ok(RequestSpec::patch(format!("/course/{id}?publish={publish}")))
        })
        .invalidates(|args| {
            vec![Tag::of("Courses"), Tag::item("Course", id_of(args, "courseId"))]
        }),
    )?;

    registry.register(
        EndpointDescriptor::mutation(DELETE_COURSE, |args| {
            Ok(RequestSpec::delete(format!("/course/{}", str_arg(args, "courseId")?)))
        })
        .invalidates(|_| vec![Tag::of("Courses")]),
    )?;

    registry.register(
        EndpointDescriptor::query(GET_LECTURES, |args| {
            Ok(RequestSpec::get(format!("/course/{}/lecture", str_arg(args, "courseId")?)))
        })
        .transform(|raw| {
            match raw.get("lectures") {
                Some(lectures) if lectures.is_array() => Ok(Shaped::Valid(lectures.clone())),
                _ => Ok(Shaped::Defaulted(Value::Array(Vec::new()))),
            }
        })
        .provides(|_, args| vec![Tag::item("Lectures", id_of(args, "courseId"))]),
    )?;

    registry.register(
        EndpointDescriptor::mutation(CREATE_LECTURE, |args| {
            let id = str_arg(args, "courseId")?;
            let body = args.get("formData").cloned().unwrap_or(Value::Null);
            Ok(RequestSpec::post(format!("/course/{id}/lecture")).json(body))
        })
        .invalidates(lecture_write_tags),
    )?;

    registry.register(
        EndpointDescriptor::query(GET_LECTURE, |args| {
            Ok(RequestSpec::get(format!("/lecture/{}", str_arg(args, "lectureId")?)))
        })
        .transform(|raw| Ok(unwrap_envelope(raw, "lecture")))
        .provides(|_, args| vec![Tag::item("Lecture", id_of(args, "lectureId"))]),
    )?;

    registry.register(
        EndpointDescriptor::mutation(UPDATE_LECTURE, |args| {
            let course_id = str_arg(args, "courseId")?;
            let lecture_id = str_arg(args, "lectureId")?;
            let body = args.get("formData").cloned().unwrap_or(Value::Null);
            Ok(RequestSpec::post(format!("/course/{course_id}/lecture/{lecture_id}")).json(body))
        })
        .invalidates(lecture_write_tags),
    )?;

    registry.register(
        EndpointDescriptor::mutation(DELETE_LECTURE, |args| {
            Ok(RequestSpec::delete(format!("/lecture/{}", str_arg(args, "lectureId")?)))
        })
        .invalidates(|_| vec![Tag::of("Course"), Tag::of("Courses")]),
    )?;

    Ok(())
}

/// Tags a lecture create/update invalidates: every course document, the
/// course collections, and the affected course's lecture list.
fn lecture_write_tags(args: &Value) -> Vec<Tag> {
    vec![
        Tag::of("Course"),
        Tag::of("Courses"),
        Tag::item("Lectures", id_of(args, "courseId")),
    ]
}

/// Required string-or-number argument, for request builders.
fn str_arg(args: &Value, field: &str) -> Result<String, ApiError> {
    match args.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ApiError::transform(format!("missing `{field}` argument"))),
    }
}

/// Best-effort id for tag derivation; tags are infallible by contract.
fn id_of(args: &Value, field: &str) -> String {
    str_arg(args, field).unwrap_or_default()
}

fn array_or_empty(raw: Value) -> Shaped {
    if raw.is_array() {
        Shaped::Valid(raw)
    } else {
        Shaped::Defaulted(Value::Array(Vec::new()))
    }
}

fn unwrap_envelope(raw: Value, field: &str) -> Shaped {
    match raw.get(field) {
        Some(inner) if !inner.is_null() => Shaped::Valid(inner.clone()),
        _ => Shaped::Defaulted(Value::Null),
    }
}

/// Builds `/course/?category=&difficulty=&search=`, skipping empty filters.
fn filter_path(args: &Value) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for field in ["category", "difficulty", "search"] {
        if let Some(value) = args.get(field).and_then(Value::as_str) {
            if !value.is_empty() {
                query.append_pair(field, value);
            }
        }
    }
    let query = query.finish();
    if query.is_empty() {
        "/course/".to_string()
    } else {
        format!("/course/?{query}")
    }
}
