use simplelog::warn;
use std::cmp::min;

use crate::dg_parsers::helpers as dg_helpers;
use crate::icao9303;
use crate::types::DecodeError;

/// A field and the check digit printed after it.
pub type CheckedField<'a> = (&'a str, char);

/// Pads (or cuts) a field to its fixed MRZ width with fillers.
fn pad_field(text: &str, len: usize) -> String {
    return format!("{:<<len$.len$}", text, len = len);
}

fn char_at(input: &str, index: usize) -> Result<char, DecodeError> {
    return input.chars().nth(index).ok_or(DecodeError::MrzFormat);
}

/// Reassembles a document number longer than the 9 characters the MRZ has room for.
///
/// ICAO 9303 p5, edition 8, 4.2.2.3, Note j: a filler instead of the check digit marks a
/// truncated number. The rest of it, its check digit and a filler open the optional data.
///
/// Returns (document_number, check_digit, optional_data).
fn split_long_document_number(
    principal: &str,
    check_digit: char,
    optional_data: &str,
) -> Result<(String, char, String), DecodeError> {
    let mut document_number = dg_helpers::remove_mrz_padding(principal);
    if check_digit != '<' || optional_data.is_empty() {
        return Ok((
            document_number,
            check_digit,
            optional_data.to_string(),
        ));
    }
    let end_of_doc_number = optional_data.find('<').unwrap_or(optional_data.len());
    if end_of_doc_number == 0 {
        return Err(DecodeError::MrzFormat);
    }
    document_number.push_str(&optional_data[..end_of_doc_number - 1]);
    let check_digit = char_at(optional_data, end_of_doc_number - 1)?;
    // Some issuers use the whole field for the number and leave out the trailing filler.
    let rest = optional_data[min(end_of_doc_number + 1, optional_data.len())..].to_string();
    return Ok((document_number, check_digit, rest));
}

/// Writes a document number back in its principal (9) + overflow form.
fn join_long_document_number(
    document_number: &str,
    check_digit: char,
    optional_data: &str,
) -> String {
    if document_number.len() <= 9 {
        return format!("{}{}{}", pad_field(document_number, 9), check_digit, optional_data);
    }
    return format!(
        "{}<{}{}<{}",
        &document_number[..9],
        &document_number[9..],
        check_digit,
        optional_data
    );
}

/// What every MRZ layout carries, whatever the positions.
pub trait MrzLayout {
    /// The MRZ as read, lines concatenated.
    fn raw(&self) -> &str;
    fn document_code(&self) -> &str;
    fn issuing_state(&self) -> &str;
    fn nationality(&self) -> &str;
    /// F, M or < (unspecified)
    fn sex(&self) -> char;
    /// Name of holder, primary and secondary identifiers separated by <<
    fn name_of_holder(&self) -> &str;
    fn document_number(&self) -> CheckedField;
    /// YYMMDD
    fn date_of_birth(&self) -> CheckedField;
    /// YYMMDD
    fn date_of_expiry(&self) -> CheckedField;
    /// The characters the composite check digit covers, and the digit itself.
    fn composite(&self) -> (String, char);

    /// Optional data with its own check digit, on layouts that have one.
    fn optional_data_check(&self) -> Option<CheckedField> {
        return None;
    }

    /// The MRZ rebuilt from the decoded fields.
    fn serialize(&self) -> String;

    /// Verifies check digits.
    ///
    /// Document number, date of birth and date of expiry must match. A composite or
    /// optional data mismatch is only logged, as issuers get these wrong in the wild.
    fn validate_check_digits(&self) -> Result<(), DecodeError> {
        let mandatory = [
            ("document number", self.document_number()),
            ("date of birth", self.date_of_birth()),
            ("date of expiry", self.date_of_expiry()),
        ];
        for (field_name, (field, check_digit)) in mandatory {
            if !icao9303::check_digit_matches(field, check_digit) {
                warn!(
                    "{} check digit is invalid (doc={}, calculated={}).",
                    field_name,
                    check_digit,
                    icao9303::calculate_check_digit(field)
                );
                return Err(DecodeError::CheckDigit { field: field_name });
            }
        }

        if let Some((optional_data, check_digit)) = self.optional_data_check() {
            if !optional_data.is_empty()
                && !icao9303::check_digit_matches(optional_data, check_digit)
            {
                warn!("Optional data check digit is invalid (doc={}).", check_digit);
            }
        }
        let (composite_base, composite_check_digit) = self.composite();
        if !icao9303::check_digit_matches(&composite_base, composite_check_digit) {
            warn!(
                "Composite check digit is invalid (doc={}, calculated={}).",
                composite_check_digit,
                icao9303::calculate_check_digit(&composite_base)
            );
        }
        return Ok(());
    }

    /// Surname(s): everything before the first <<, fillers turned into spaces.
    fn primary_identifier(&self) -> String {
        let (_, last_name) = dg_helpers::format_mrz_name(self.name_of_holder());
        return last_name.trim().to_string();
    }

    /// Given name(s): everything after the first <<, fillers turned into spaces.
    fn secondary_identifier(&self) -> String {
        let (first_name, _) = dg_helpers::format_mrz_name(self.name_of_holder());
        return first_name.trim().to_string();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mrz {
    TD1(TD1Mrz),
    TD2(TD2Mrz),
    TD3(TD3Mrz),
}

impl Mrz {
    pub fn deserialize(input: &str) -> Result<Mrz, DecodeError> {
        if !input
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'<')
        {
            return Err(DecodeError::MrzFormat);
        }
        return match input.len() {
            90 => Ok(Mrz::TD1(TD1Mrz::deserialize(input)?)),
            72 => Ok(Mrz::TD2(TD2Mrz::deserialize(input)?)),
            88 => Ok(Mrz::TD3(TD3Mrz::deserialize(input)?)),
            len => Err(DecodeError::MrzLength(len)),
        };
    }

    pub fn layout(&self) -> &dyn MrzLayout {
        return match self {
            Self::TD1(mrz) => mrz,
            Self::TD2(mrz) => mrz,
            Self::TD3(mrz) => mrz,
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TD1Mrz {
    // ICAO 9303 part 5, edition 8, 4.2.2
    /// 90 characters of MRZ (physically shown as 3 lines)
    pub raw_mrz: String,
    // Line 1
    /// 2 characters, the first one is I, A or C.
    pub document_code: String,
    pub issuing_state: String,
    /// Up to 9 characters, more if the issuer overflowed into the optional data
    pub document_number: String,
    pub document_number_check_digit: char,
    /// up to 15 characters
    pub optional_data_elements_line_1: String,
    // Line 2
    pub date_of_birth: String,
    pub date_of_birth_check_digit: char,
    pub sex: char,
    pub date_of_expiry: String,
    pub date_of_expiry_check_digit: char,
    pub nationality: String,
    /// up to 11 characters
    pub optional_data_elements_line_2: String,
    pub composite_check_digit: char,
    // Line 3
    /// 30 characters
    pub name_of_holder: String,
}

impl TD1Mrz {
    pub fn deserialize(input: &str) -> Result<TD1Mrz, DecodeError> {
        if input.len() != 90 {
            return Err(DecodeError::MrzLength(input.len()));
        }
        let (document_number, document_number_check_digit, optional_data_elements_line_1) =
            split_long_document_number(
                &input[5..14],
                char_at(input, 14)?,
                &dg_helpers::remove_mrz_padding(&input[15..30]),
            )?;
        return Ok(TD1Mrz {
            raw_mrz: input.to_string(),
            document_code: input[0..2].to_string(),
            issuing_state: dg_helpers::remove_mrz_padding(&input[2..5]),
            document_number,
            document_number_check_digit,
            optional_data_elements_line_1,
            date_of_birth: input[30..36].to_string(),
            date_of_birth_check_digit: char_at(input, 36)?,
            sex: char_at(input, 37)?,
            date_of_expiry: input[38..44].to_string(),
            date_of_expiry_check_digit: char_at(input, 44)?,
            nationality: dg_helpers::remove_mrz_padding(&input[45..48]),
            optional_data_elements_line_2: dg_helpers::remove_mrz_padding(&input[48..59]),
            composite_check_digit: char_at(input, 59)?,
            name_of_holder: dg_helpers::remove_mrz_padding(&input[60..90]),
        });
    }
}

impl MrzLayout for TD1Mrz {
    fn raw(&self) -> &str {
        return &self.raw_mrz;
    }

    fn document_code(&self) -> &str {
        return &self.document_code;
    }

    fn issuing_state(&self) -> &str {
        return &self.issuing_state;
    }

    fn nationality(&self) -> &str {
        return &self.nationality;
    }

    fn sex(&self) -> char {
        return self.sex;
    }

    fn name_of_holder(&self) -> &str {
        return &self.name_of_holder;
    }

    fn document_number(&self) -> CheckedField {
        return (&self.document_number, self.document_number_check_digit);
    }

    fn date_of_birth(&self) -> CheckedField {
        return (&self.date_of_birth, self.date_of_birth_check_digit);
    }

    fn date_of_expiry(&self) -> CheckedField {
        return (&self.date_of_expiry, self.date_of_expiry_check_digit);
    }

    fn composite(&self) -> (String, char) {
        // ICAO 9303 p5, edition 8, 4.2.4:
        // 6 – 30 (upper line), 1 – 7, 9 – 15, 19 – 29 (middle line)
        let raw = &self.raw_mrz;
        let composite_base = [&raw[5..30], &raw[30..37], &raw[38..45], &raw[48..59]].concat();
        return (composite_base, self.composite_check_digit);
    }

    fn serialize(&self) -> String {
        let line_1 = format!(
            "{}{}{}",
            pad_field(&self.document_code, 2),
            pad_field(&self.issuing_state, 3),
            join_long_document_number(
                &self.document_number,
                self.document_number_check_digit,
                &self.optional_data_elements_line_1
            )
        );
        let line_2 = format!(
            "{}{}{}{}{}{}{}",
            self.date_of_birth,
            self.date_of_birth_check_digit,
            self.sex,
            self.date_of_expiry,
            self.date_of_expiry_check_digit,
            pad_field(&self.nationality, 3),
            pad_field(&self.optional_data_elements_line_2, 11),
        );
        return format!(
            "{}{}{}{}",
            pad_field(&line_1, 30),
            line_2,
            self.composite_check_digit,
            pad_field(&self.name_of_holder, 30)
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TD2Mrz {
    // ICAO 9303 part 6, edition 8, 4.2.2
    /// 72 characters of MRZ (physically shown as 2 lines)
    pub raw_mrz: String,
    pub document_code: String,
    pub issuing_state: String,
    /// 31 characters
    pub name_of_holder: String,
    pub document_number: String,
    pub document_number_check_digit: char,
    pub nationality: String,
    pub date_of_birth: String,
    pub date_of_birth_check_digit: char,
    pub sex: char,
    pub date_of_expiry: String,
    pub date_of_expiry_check_digit: char,
    /// up to 7 characters
    pub optional_data_elements: String,
    pub composite_check_digit: char,
}

impl TD2Mrz {
    pub fn deserialize(input: &str) -> Result<TD2Mrz, DecodeError> {
        if input.len() != 72 {
            return Err(DecodeError::MrzLength(input.len()));
        }
        let (document_number, document_number_check_digit, optional_data_elements) =
            split_long_document_number(
                &input[36..45],
                char_at(input, 45)?,
                &dg_helpers::remove_mrz_padding(&input[64..71]),
            )?;
        return Ok(TD2Mrz {
            raw_mrz: input.to_string(),
            document_code: input[0..2].to_string(),
            issuing_state: dg_helpers::remove_mrz_padding(&input[2..5]),
            name_of_holder: dg_helpers::remove_mrz_padding(&input[5..36]),
            document_number,
            document_number_check_digit,
            nationality: dg_helpers::remove_mrz_padding(&input[46..49]),
            date_of_birth: input[49..55].to_string(),
            date_of_birth_check_digit: char_at(input, 55)?,
            sex: char_at(input, 56)?,
            date_of_expiry: input[57..63].to_string(),
            date_of_expiry_check_digit: char_at(input, 63)?,
            optional_data_elements,
            composite_check_digit: char_at(input, 71)?,
        });
    }
}

impl MrzLayout for TD2Mrz {
    fn raw(&self) -> &str {
        return &self.raw_mrz;
    }

    fn document_code(&self) -> &str {
        return &self.document_code;
    }

    fn issuing_state(&self) -> &str {
        return &self.issuing_state;
    }

    fn nationality(&self) -> &str {
        return &self.nationality;
    }

    fn sex(&self) -> char {
        return self.sex;
    }

    fn name_of_holder(&self) -> &str {
        return &self.name_of_holder;
    }

    fn document_number(&self) -> CheckedField {
        return (&self.document_number, self.document_number_check_digit);
    }

    fn date_of_birth(&self) -> CheckedField {
        return (&self.date_of_birth, self.date_of_birth_check_digit);
    }

    fn date_of_expiry(&self) -> CheckedField {
        return (&self.date_of_expiry, self.date_of_expiry_check_digit);
    }

    fn composite(&self) -> (String, char) {
        // lower line positions 1 – 10, 14 – 20, 22 – 35
        let raw = &self.raw_mrz;
        let composite_base = [&raw[36..46], &raw[49..56], &raw[57..71]].concat();
        return (composite_base, self.composite_check_digit);
    }

    fn serialize(&self) -> String {
        // the overflowed document number shares the optional data field
        let number_and_optional_data = join_long_document_number(
            &self.document_number,
            self.document_number_check_digit,
            "",
        );
        let (principal, overflow) = number_and_optional_data.split_at(10);
        let optional_data = format!("{}{}", overflow, self.optional_data_elements);
        return format!(
            "{}{}{}{}{}{}{}{}{}{}{}{}",
            pad_field(&self.document_code, 2),
            pad_field(&self.issuing_state, 3),
            pad_field(&self.name_of_holder, 31),
            principal,
            pad_field(&self.nationality, 3),
            self.date_of_birth,
            self.date_of_birth_check_digit,
            self.sex,
            self.date_of_expiry,
            self.date_of_expiry_check_digit,
            pad_field(&optional_data, 7),
            self.composite_check_digit
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TD3Mrz {
    // ICAO 9303 part 4, edition 8, 4.2.2
    /// 88 characters of MRZ (physically shown as 2 lines)
    pub raw_mrz: String,
    /// 2 characters. The first character shall be P to designate an MRP.
    pub document_code: String,
    pub issuing_state: String,
    /// 39 characters.
    pub name_of_holder: String,
    /// 9 characters
    pub document_number: String,
    pub document_number_check_digit: char,
    pub nationality: String,
    pub date_of_birth: String,
    pub date_of_birth_check_digit: char,
    pub sex: char,
    pub date_of_expiry: String,
    pub date_of_expiry_check_digit: char,
    /// 14 characters, padded with <
    pub personal_number_or_optional_data_elements: String,
    /// Can be 0 or < if personal_number_or_optional_data_elements is unused.
    pub personal_number_or_optional_data_elements_check_digit: char,
    pub composite_check_digit: char,
}

impl TD3Mrz {
    pub fn deserialize(input: &str) -> Result<TD3Mrz, DecodeError> {
        if input.len() != 88 {
            return Err(DecodeError::MrzLength(input.len()));
        }
        return Ok(TD3Mrz {
            raw_mrz: input.to_string(),
            document_code: input[0..2].to_string(),
            issuing_state: dg_helpers::remove_mrz_padding(&input[2..5]),
            name_of_holder: dg_helpers::remove_mrz_padding(&input[5..44]),
            document_number: dg_helpers::remove_mrz_padding(&input[44..53]),
            document_number_check_digit: char_at(input, 53)?,
            nationality: dg_helpers::remove_mrz_padding(&input[54..57]),
            date_of_birth: input[57..63].to_string(),
            date_of_birth_check_digit: char_at(input, 63)?,
            sex: char_at(input, 64)?,
            date_of_expiry: input[65..71].to_string(),
            date_of_expiry_check_digit: char_at(input, 71)?,
            personal_number_or_optional_data_elements: dg_helpers::remove_mrz_padding(
                &input[72..86],
            ),
            personal_number_or_optional_data_elements_check_digit: char_at(input, 86)?,
            composite_check_digit: char_at(input, 87)?,
        });
    }
}

impl MrzLayout for TD3Mrz {
    fn raw(&self) -> &str {
        return &self.raw_mrz;
    }

    fn document_code(&self) -> &str {
        return &self.document_code;
    }

    fn issuing_state(&self) -> &str {
        return &self.issuing_state;
    }

    fn nationality(&self) -> &str {
        return &self.nationality;
    }

    fn sex(&self) -> char {
        return self.sex;
    }

    fn name_of_holder(&self) -> &str {
        return &self.name_of_holder;
    }

    fn document_number(&self) -> CheckedField {
        return (&self.document_number, self.document_number_check_digit);
    }

    fn date_of_birth(&self) -> CheckedField {
        return (&self.date_of_birth, self.date_of_birth_check_digit);
    }

    fn date_of_expiry(&self) -> CheckedField {
        return (&self.date_of_expiry, self.date_of_expiry_check_digit);
    }

    fn composite(&self) -> (String, char) {
        // ICAO 9303 p4, edition 8, 4.2.2.2: lower line positions 1 to 10, 14 to 20 and 22 to 43
        let raw = &self.raw_mrz;
        let composite_base = [&raw[44..54], &raw[57..64], &raw[65..87]].concat();
        return (composite_base, self.composite_check_digit);
    }

    fn optional_data_check(&self) -> Option<CheckedField> {
        return Some((
            &self.personal_number_or_optional_data_elements,
            self.personal_number_or_optional_data_elements_check_digit,
        ));
    }

    fn serialize(&self) -> String {
        return format!(
            "{}{}{}{}{}{}{}{}{}{}{}{}{}{}",
            pad_field(&self.document_code, 2),
            pad_field(&self.issuing_state, 3),
            pad_field(&self.name_of_holder, 39),
            pad_field(&self.document_number, 9),
            self.document_number_check_digit,
            pad_field(&self.nationality, 3),
            self.date_of_birth,
            self.date_of_birth_check_digit,
            self.sex,
            self.date_of_expiry,
            self.date_of_expiry_check_digit,
            pad_field(&self.personal_number_or_optional_data_elements, 14),
            self.personal_number_or_optional_data_elements_check_digit,
            self.composite_check_digit
        );
    }
}
