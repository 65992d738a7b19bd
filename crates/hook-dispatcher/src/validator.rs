// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use crate::error::ValidationError;

pub const HEADER_USER_AGENT: &str = "User-Agent";

/// Checks that a message carries the expected `User-Agent` and a payload.
pub fn validate_message(
    payload: &[u8],
    headers: &HashMap<String, String>,
    expected_user_agent: &str,
) -> Result<(), ValidationError> {
    if headers.is_empty()
        || headers.get(HEADER_USER_AGENT).map(String::as_str) != Some(expected_user_agent)
    {
        return Err(ValidationError::MissingOrInvalidHeader);
    }

    if payload.is_empty() {
        return Err(ValidationError::EmptyPayload);
    }

    Ok(())
}
