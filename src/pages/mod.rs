use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription,
    CardHeader, CardTitle, Input, Label, Spinner,
};
use crate::gate::GateView;
use crate::models::Note;
use crate::state::AppContext;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
fn ErrorAlert(#[prop(into)] message: Signal<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || message.get().is_some() fallback=|| ().into_view()>
            {move || {
                message.get().map(|e| {
                    view! {
                        <Alert class="border-destructive/30">
                            <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                        </Alert>
                    }
                })
            }}
        </Show>
    }
}

/// Picks the credential form or the notes view from the tracked session.
#[component]
pub fn AuthGatePage() -> impl IntoView {
    let gate = expect_context::<AppContext>().0.gate;
    let session = gate.tracker().watch();
    let gate_view = Memo::new(move |_| GateView::from(&session.get()));

    move || match gate_view.get() {
        GateView::Loading => view! {
            <div class="flex min-h-screen items-center justify-center text-xs text-muted-foreground">
                <span class="inline-flex items-center gap-2">
                    <Spinner />
                    "Loading..."
                </span>
            </div>
        }
        .into_any(),
        GateView::Unauthenticated => view! { <CredentialPage /> }.into_any(),
        GateView::Authenticated { .. } => view! { <NotesPage /> }.into_any(),
    }
}

#[component]
pub fn CredentialPage() -> impl IntoView {
    let gate = expect_context::<AppContext>().0.gate;
    let form = gate.form();

    // Outcomes land in the form's error/notice signals.
    let on_submit = {
        let gate = gate.clone();
        move |ev: web_sys::SubmitEvent| {
            ev.prevent_default();
            let gate = gate.clone();
            spawn_local(async move {
                let _ = gate.login().await;
            });
        }
    };

    let on_signup = {
        let gate = gate.clone();
        move |_: web_sys::MouseEvent| {
            let gate = gate.clone();
            spawn_local(async move {
                let _ = gate.signup().await;
            });
        }
    };

    let on_reset = move |_: web_sys::MouseEvent| {
        let gate = gate.clone();
        spawn_local(async move {
            let _ = gate.reset_password().await;
        });
    };

    let busy = form.busy;
    let email = form.email;
    let notice = form.notice;

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex min-h-screen w-full max-w-sm flex-col justify-center px-4 py-10">
                <div class="mb-6 flex items-center justify-center">
                    <span class="text-sm font-medium text-foreground">"Pocket Notes"</span>
                </div>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">"Log in"</CardTitle>
                        <CardDescription class="text-xs">"Use your email and password to continue."</CardDescription>
                    </CardHeader>

                    <CardContent>
                        <form class="flex flex-col gap-3" on:submit=on_submit>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="email" class="text-xs">"Email"</Label>
                                <Input
                                    id="email"
                                    r#type="email"
                                    placeholder="you@example.com"
                                    bind_value=form.email
                                    required=true
                                    class="h-8 text-sm"
                                />
                            </div>

                            <div class="flex flex-col gap-1.5">
                                <Label html_for="password" class="text-xs">"Password"</Label>
                                <Input
                                    id="password"
                                    r#type="password"
                                    placeholder="••••••••"
                                    bind_value=form.password
                                    class="h-8 text-sm"
                                />
                            </div>

                            <ErrorAlert message=form.error />

                            <Show when=move || notice.get().is_some() fallback=|| ().into_view()>
                                <Alert>
                                    <AlertDescription class="text-xs">
                                        {move || notice.get().unwrap_or_default()}
                                    </AlertDescription>
                                </Alert>
                            </Show>

                            <Button class="w-full" size=ButtonSize::Sm attr:disabled=move || busy.get()>
                                <span class="inline-flex items-center gap-2">
                                    <Show when=move || busy.get() fallback=|| ().into_view()>
                                        <Spinner />
                                    </Show>
                                    {move || if busy.get() { "Working..." } else { "Log in" }}
                                </span>
                            </Button>
                        </form>
                        <div class="flex flex-col gap-2 pt-3">
                            <Button
                                class="w-full"
                                variant=ButtonVariant::Outline
                                size=ButtonSize::Sm
                                attr:disabled=move || busy.get()
                                on:click=on_signup
                            >
                                "Sign up"
                            </Button>

                            <Button
                                class="w-full"
                                variant=ButtonVariant::Link
                                size=ButtonSize::Sm
                                attr:disabled=move || busy.get() || email.with(|e| e.trim().is_empty())
                                on:click=on_reset
                            >
                                "Forgot password?"
                            </Button>
                        </div>
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}

#[component]
pub fn NotesPage() -> impl IntoView {
    let gate = expect_context::<AppContext>().0.gate;
    let notes = gate.store().watch_notes();
    let loading = gate.store().watch_loading();
    let edit = gate.edit();
    let editing = edit.watch();

    let new_note: RwSignal<String> = RwSignal::new(String::new());
    let draft: RwSignal<String> = RwSignal::new(String::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let adding: RwSignal<bool> = RwSignal::new(false);

    let on_add = {
        let gate = gate.clone();
        move |ev: web_sys::SubmitEvent| {
            ev.prevent_default();
            let content = new_note.get_untracked();
            let gate = gate.clone();
            adding.set(true);
            error.set(None);
            spawn_local(async move {
                match gate.store().add(&content).await {
                    Ok(()) => new_note.set(String::new()),
                    Err(e) => error.set(Some(e.to_string())),
                }
                adding.set(false);
            });
        }
    };

    let on_logout = {
        let gate = gate.clone();
        move |_: web_sys::MouseEvent| {
            let gate = gate.clone();
            spawn_local(async move {
                gate.logout().await;
            });
        }
    };

    let session = gate.tracker().watch();
    let user_email = move || {
        session
            .with(|s| s.session().and_then(|s| s.email.clone()))
            .unwrap_or_default()
    };

    let render_note = move |note: Note| {
        let gate = expect_context::<AppContext>().0.gate;
        let created = note.created_at.format("%Y-%m-%d %H:%M").to_string();

        if edit.is_editing(&note.id) {
            let on_save = {
                let gate = gate.clone();
                move |_: web_sys::MouseEvent| {
                    let gate = gate.clone();
                    error.set(None);
                    spawn_local(async move {
                        let result = match edit.edit(&draft.get_untracked()) {
                            Ok(()) => edit.save(gate.store()).await,
                            Err(e) => Err(e),
                        };
                        if let Err(e) = result {
                            error.set(Some(e.to_string()));
                        }
                    });
                }
            };

            return view! {
                <Card>
                    <CardContent class="flex flex-col gap-2 p-3">
                        <Input bind_value=draft class="h-8 text-sm" autofocus=true />
                        <div class="flex items-center gap-2">
                            <Button size=ButtonSize::Sm on:click=on_save>"Save"</Button>
                            <Button
                                variant=ButtonVariant::Ghost
                                size=ButtonSize::Sm
                                on:click=move |_: web_sys::MouseEvent| edit.cancel()
                            >
                                "Cancel"
                            </Button>
                        </div>
                    </CardContent>
                </Card>
            }
            .into_any();
        }

        let on_edit = {
            let note = note.clone();
            move |_: web_sys::MouseEvent| {
                draft.set(note.content.clone());
                edit.begin(&note);
            }
        };

        let on_delete = {
            let id = note.id.clone();
            move |_: web_sys::MouseEvent| {
                let gate = gate.clone();
                let id = id.clone();
                error.set(None);
                spawn_local(async move {
                    if let Err(e) = gate.store().remove(&id).await {
                        error.set(Some(e.to_string()));
                    }
                });
            }
        };

        view! {
            <Card>
                <CardContent class="group flex items-start gap-3 p-3">
                    <div class="min-w-0 flex-1">
                        <div class="whitespace-pre-wrap break-words text-sm">{note.content}</div>
                        <div class="pt-1 text-[11px] text-muted-foreground">{created}</div>
                    </div>
                    <div class="flex shrink-0 items-center gap-1">
                        <Button
                            variant=ButtonVariant::Ghost
                            size=ButtonSize::Sm
                            attr:title="Edit"
                            on:click=on_edit
                        >
                            "Edit"
                        </Button>
                        <Button
                            variant=ButtonVariant::Ghost
                            size=ButtonSize::Sm
                            class="text-destructive"
                            attr:title="Delete"
                            on:click=on_delete
                        >
                            "Delete"
                        </Button>
                    </div>
                </CardContent>
            </Card>
        }
        .into_any()
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex w-full max-w-2xl flex-col gap-4 px-4 py-8">
                <div class="flex items-center justify-between">
                    <div>
                        <div class="text-sm font-medium">"My Notes"</div>
                        <div class="text-xs text-muted-foreground">{user_email}</div>
                    </div>
                    <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_logout>
                        "Log out"
                    </Button>
                </div>

                <form class="flex items-center gap-2" on:submit=on_add>
                    <div class="min-w-0 flex-1">
                        <Input placeholder="Write a note..." bind_value=new_note class="h-8 text-sm" />
                    </div>
                    <Button size=ButtonSize::Sm attr:disabled=move || adding.get()>"Add"</Button>
                </form>

                <ErrorAlert message=error />

                <div class="flex flex-col gap-2">
                    {move || {
                        // Re-render when the edit target changes.
                        editing.track();
                        let list = notes.get();
                        if list.is_empty() {
                            let text = if loading.get() { "Loading notes..." } else { "No notes yet" };
                            return view! {
                                <div class="py-6 text-center text-xs text-muted-foreground">{text}</div>
                            }
                            .into_any();
                        }
                        list.into_iter().map(render_note.clone()).collect_view().into_any()
                    }}
                </div>
            </div>
        </div>
    }
}
