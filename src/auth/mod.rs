/*!
 * # Authentication
 *
 * Password sign-in is delegated to the hosted identity provider. After the
 * provider accepts the credentials the user's profile row decides whether
 * the role picked on the login form is really theirs, and which dashboard
 * the session lands on.
 */

mod session;

pub use session::{Destination, LoginOutcome, LoginRequest, NavigationState, SessionResolver};
