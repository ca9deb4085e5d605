use super::prelude::*;

pub fn is_onboarding_dismissed<R>(repo: &R) -> Result<bool>
where
    R: OnboardingRepo,
{
    Ok(repo.is_onboarding_dismissed()?)
}

pub fn dismiss_onboarding<R>(repo: &R) -> Result<()>
where
    R: OnboardingRepo,
{
    if repo.is_onboarding_dismissed()? {
        return Ok(());
    }
    log::debug!("Dismissing the onboarding");
    Ok(repo.set_onboarding_dismissed(true)?)
}
