//! # System Constants
//!
//! Collection names, payload field names and the user-facing messages the
//! command handlers produce.

/// Backend collections touched by the built-in handlers
pub mod collections {
    pub const ACCOUNTS: &str = "accounts";
    pub const REST_POINTS: &str = "rest_points";
    pub const BANNERS: &str = "banners";
    pub const TAGS: &str = "tags";
    pub const ADDRESSES: &str = "addresses";
    pub const ABSENCES: &str = "absences";
    pub const JUSTIFICATIONS: &str = "justifications";
}

/// Payload and record field names
pub mod fields {
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const EMAIL: &str = "email";

    pub const REST_POINT_ID: &str = "restPointId";
    pub const IMAGE_DATA: &str = "imageData";
    pub const IMAGE_TYPE: &str = "imageType";
    pub const MAX_BANNERS: &str = "maxBanners";

    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";

    pub const ACCOUNT_ID: &str = "accountId";
    pub const CURRENT_PASSWORD: &str = "currentPassword";
    pub const NEW_PASSWORD: &str = "newPassword";
    pub const CONFIRM_PASSWORD: &str = "confirmPassword";

    pub const ADDRESS_ID: &str = "addressId";
    pub const OWNER_ID: &str = "ownerId";

    pub const STUDENT_ID: &str = "studentId";
    pub const ABSENCE_DATE: &str = "absenceDate";
    pub const REASON: &str = "reason";
    pub const JUSTIFIED: &str = "justified";
    pub const JUSTIFICATION_ID: &str = "justificationId";

    pub const CREATED_BY: &str = "createdBy";
    pub const CREATED_AT: &str = "createdAt";
}

/// Business-rule messages shown to the user verbatim
pub mod messages {
    pub const NOT_AUTHENTICATED: &str = "You must be logged in to perform this operation";
    pub const USERNAME_TAKEN: &str = "Username already taken";
    pub const REST_POINT_NOT_FOUND: &str = "Rest point not found";
    pub const MAX_BANNERS_REACHED: &str = "Max banners reached";
    pub const TAG_EXISTS: &str = "Tag already exists";
    pub const ACCOUNT_NOT_FOUND: &str = "Account not found";
    pub const NOT_ACCOUNT_OWNER: &str = "You can only change your own password";
    pub const WRONG_PASSWORD: &str = "Current password is incorrect";
    pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";
    pub const PASSWORD_UNCHANGED: &str = "New password must differ from the current one";
    pub const ADDRESS_NOT_FOUND: &str = "Address not found";
    pub const NOT_ADDRESS_OWNER: &str = "You are not authorized to delete this address";
    pub const ABSENCE_NOT_FOUND: &str = "Absence not found";
    pub const ALREADY_JUSTIFIED: &str = "Absence already justified";
    pub const NO_IMAGE_SELECTED: &str = "No image selected";
    pub const UNSUPPORTED_IMAGE_TYPE: &str = "Unsupported image type";
}
