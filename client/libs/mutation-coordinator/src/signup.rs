//! Sign-up pipeline
//!
//! Create account → create profile → sign in → check session. Each step
//! short-circuits the rest on failure and the error names the step.

use snapgram_types::{NewAccount, NewUserProfile, SignUpForm, User};
use tracing::{debug, info};

use crate::coordinator::MutationCoordinator;
use crate::error::{SignUpError, SignUpStep};
use crate::invalidation::Mutation;

impl MutationCoordinator {
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<User, SignUpError> {
        let new_account = form
            .check()
            .map_err(|e| SignUpError::new(SignUpStep::Validate, e))?;

        match self.run_sign_up(form, &new_account).await {
            Ok(user) => {
                self.succeeded(&Mutation::SignUp);
                info!(user_id = %user.id, username = %user.username, "Signed up");
                Ok(user)
            }
            Err(e) => {
                let SignUpError { step, source } = e;
                let source = self.failed(&Mutation::SignUp, source);
                Err(SignUpError { step, source })
            }
        }
    }

    async fn run_sign_up(
        &self,
        form: &SignUpForm,
        new_account: &NewAccount,
    ) -> Result<User, SignUpError> {
        let ops = self.ops();

        let account = ops
            .create_account(new_account)
            .await
            .map_err(|e| SignUpError::new(SignUpStep::CreateAccount, e))?;
        debug!(account_id = %account.id, "Sign-up: account created");

        let profile = NewUserProfile {
            account_id: account.id,
            name: form.name.clone(),
            username: form.username.clone(),
            email: form.email.clone(),
            image_url: ops.avatar_url_for(&form.name),
        };
        let user = ops
            .create_user_profile(&profile)
            .await
            .map_err(|e| SignUpError::new(SignUpStep::CreateProfile, e))?;
        debug!(user_id = %user.id, "Sign-up: profile created");

        ops.sign_in(&form.credentials())
            .await
            .map_err(|e| SignUpError::new(SignUpStep::SignIn, e))?;

        self.establish_session()
            .await
            .map_err(|e| SignUpError::new(SignUpStep::CheckSession, e))
    }
}
