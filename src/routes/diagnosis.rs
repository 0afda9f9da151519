use actix_web::{
    get,
    http::StatusCode,
    post,
    web::{self, Data},
    HttpResponse, Responder,
};
use serde::{Deserialize, Serialize};

use super::{form_error, page, page_context};
use crate::{
    diagnosis::{Gender, Symptoms},
    errors::AppError,
    session::MaybeUser,
    AppState,
};

const MAX_AGE: u8 = 150;
const BACKEND_FAILURE: &str = "An error occurred. Please try again later.";

#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiagnosisForm {
    age: String,
    gender: String,
    duration: String,
    symptoms: String,
    allergies: String,
    medications: String,
}

impl DiagnosisForm {
    fn validate(&self) -> Result<Symptoms, &'static str> {
        if self.age.trim().is_empty()
            || self.gender.trim().is_empty()
            || self.duration.trim().is_empty()
            || self.symptoms.trim().is_empty()
        {
            return Err("Age, gender, duration and symptoms are required.");
        }
        let age = self
            .age
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|age| *age <= MAX_AGE)
            .ok_or("Age must be a whole number between 0 and 150.")?;
        let gender = match self.gender.trim() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            "other" => Gender::Other,
            _ => return Err("Please choose a gender."),
        };
        Ok(Symptoms {
            age,
            gender,
            duration: self.duration.trim().to_owned(),
            symptoms: self.symptoms.trim().to_owned(),
            allergies: self.allergies.trim().to_owned(),
            medications: self.medications.trim().to_owned(),
        })
    }
}

#[get("/self-diagnosis")]
pub async fn self_diagnosis_handler(
    MaybeUser(user): MaybeUser,
) -> Result<impl Responder, AppError> {
    page("self_diagnosis.html", &page_context("Self Diagnosis", user.as_ref()))
}

#[post("/self-diagnosis")]
pub async fn self_diagnosis_form_handler(
    web::Form(form): web::Form<DiagnosisForm>,
    state: Data<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<HttpResponse, AppError> {
    let mut context = page_context("Self Diagnosis", user.as_ref());
    context.insert("form", &form);

    let symptoms = match form.validate() {
        Ok(symptoms) => symptoms,
        Err(message) => {
            return form_error(StatusCode::BAD_REQUEST, "self_diagnosis.html", context, message)
        }
    };

    match state.diagnosis.diagnose(&symptoms).await {
        Ok(text) => context.insert("diagnosis", &text),
        Err(e) => {
            log::error!("Self-diagnosis request failed: {}", e);
            context.insert("error", BACKEND_FAILURE);
        }
    }
    page("self_diagnosis.html", &context)
}
