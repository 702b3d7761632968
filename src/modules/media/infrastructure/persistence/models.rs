/// Diesel models for the label and keyword tables
use crate::schema::{image_labels, image_text_keywords, labels, text_keywords};
use diesel::prelude::*;

#[derive(Insertable, Debug)]
#[diesel(table_name = labels)]
pub struct NewLabel<'a> {
    pub name: &'a str,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = image_labels)]
pub struct NewImageLabel {
    pub image_id: i64,
    pub label_id: i64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = text_keywords)]
pub struct NewTextKeyword<'a> {
    pub keyword: &'a str,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = image_text_keywords)]
pub struct NewImageTextKeyword {
    pub image_id: i64,
    pub text_keyword_id: i64,
}
