mod digest;
mod onboarding;
mod scheduler;

#[cfg(test)]
mod testing;

pub use digest::DigestPipeline;
pub use onboarding::OnboardingPipeline;
pub use scheduler::start_digest_schedule;
